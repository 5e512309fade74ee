fn main() {
    if let Err(e) = ticket_carry::cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
