use std::io;
use std::io::Write;

use async_trait::async_trait;

pub fn mfa_serial(account_id: &str, user_name: &str) -> String {
    format!("arn:aws:iam::{}:mfa/{}", account_id, user_name)
}

#[async_trait]
pub trait ReadMfaToken {
    async fn read_mfa_token(&self, mfa_serial: &str) -> io::Result<String>;
}

/// Blocks on stdin until the user enters a token code. There is no timeout.
pub struct StdinMfaTokenReader;

#[async_trait]
impl ReadMfaToken for StdinMfaTokenReader {
    async fn read_mfa_token(&self, mfa_serial: &str) -> io::Result<String> {
        print!("Enter token for {}: ", mfa_serial);
        io::stdout().flush()?;

        let mut code = String::new();
        io::stdin().read_line(&mut code)?;
        Ok(code.trim().to_string())
    }
}
