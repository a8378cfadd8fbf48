fn main() {
    if let Err(err) = labchem_import::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
