use std::process;

fn main() {
    if let Err(err) = barnacle::run() {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}
