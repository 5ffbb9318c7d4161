fn main() {
  if let Err(e) = pulse_log_lib::run() {
    eprintln!("pulse-log: {}", e);
    std::process::exit(1);
  }
}
