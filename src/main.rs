fn main() {
    if let Err(err) = ds_loader::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
