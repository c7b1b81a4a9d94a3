fn main() {
    if let Err(err) = sheet_validate::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
