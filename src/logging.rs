use log::LevelFilter;
use simple_logger::SimpleLogger;

/**
 * The logger every program in this crate uses.
 *
 * Everything logs at Info. With `verbose`, this crate and the named program log at Debug, while
 * dependencies such as the HTTP client stay at Info.
 *
 * #Arguments
 * * program - the binary's module name, e.g. "monitor".
 * * verbose - turn on debug output for this crate and the program.
 */
pub fn program_logger(program: &str, verbose: bool) -> SimpleLogger {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .with_module_level("skainet", level)
        .with_module_level(program, level)
}
