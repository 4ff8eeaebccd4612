fn main() {
    if let Err(e) = podwatch_console_lib::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
