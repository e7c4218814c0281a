use std::convert::Infallible;
use std::env;
use std::ffi::CString;
use std::io;

use tracing::debug;

use crate::error::{PortrayError, Result};
use crate::handler::{into_variables, prompt, HandleCredentials, HandleCredentialsRequest, Variable};

/// Replaces the current process with `$SHELL`, carrying the exported credentials.
pub struct ShellCredentialsHandler;

impl HandleCredentials for ShellCredentialsHandler {
    fn handle_credentials(&self, request: HandleCredentialsRequest) -> Result<()> {
        let session_label = prompt(request.record.account_id(), request.role_label, "");
        set_credentials(&request);

        println!("Starting shell with Session in: {}", session_label);
        let shell = env::var("SHELL").map_err(PortrayError::ShellUnset)?;
        match exec_shell(shell)? {}
    }
}

fn set_credentials(request: &HandleCredentialsRequest) {
    println!("Setting ENV VARS");
    for Variable { name, value } in into_variables(request) {
        if let Some(value) = value {
            env::set_var(name, value);
        } else {
            env::remove_var(name);
        }
    }
}

fn exec_shell(shell: String) -> Result<Infallible> {
    debug!("shell: {}, ", &shell);

    let path = CString::new(shell.as_bytes()).map_err(|e| PortrayError::ShellLaunch {
        shell: shell.clone(),
        source: io::Error::from(e),
    })?;
    let args = [path.as_c_str()];
    nix::unistd::execv(&path, &args).map_err(|errno| PortrayError::ShellLaunch {
        shell,
        source: io::Error::from(errno),
    })
}
