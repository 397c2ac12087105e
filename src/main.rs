fn main() {
    if let Err(err) = llamash::cli::main() {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}
