pub mod log;

pub fn print_error(err: &dyn std::error::Error) {
    eprintln!("error: {}", err);
    let mut cause = err.source();
    while let Some(err) = cause {
        eprintln!("caused by: {}", err);
        cause = err.source();
    }
}
