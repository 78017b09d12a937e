use std::{io, panic, process::ExitCode};

use log::{error, warn};
use tcad_compile::session::{Editor, Session};

fn main() -> ExitCode {
    pretty_env_logger::init();
    // Panics are reported by the session, keep stdout clean
    panic::set_hook(Box::new(|info| error!("{info}")));

    let mut session = Session::new();
    // Ctrl-C outside a read must not kill the session. The line editor
    // reports Ctrl-C during a read itself.
    let interrupt = session.interrupt().clone();
    if let Err(e) = ctrlc::set_handler(move || interrupt.set()) {
        warn!("Failed to install the interrupt handler: {e}");
    }
    let mut editor = match Editor::new(session.interrupt().clone()) {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    match session.run(&mut editor, &mut io::stdout()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
