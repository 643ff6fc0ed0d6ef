//! SMTP email delivery adapter — a minimal client speaking the SMTP command sequence
//! directly over TCP, since the notification surface here is narrow enough not to
//! warrant a full mail-handling dependency.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::NotifyError;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl SmtpConfig {
    pub fn is_configured(&self) -> bool {
        !self.host.is_empty() && !self.username.is_empty()
    }
}

pub async fn send_email(config: &SmtpConfig, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
    if !config.is_configured() {
        return Err(NotifyError::NotConfigured("SMTP credentials are not set".to_string()));
    }

    let mut stream = TcpStream::connect((config.host.as_str(), config.port))
        .await
        .map_err(|e| NotifyError::DeliveryFailed(format!("connect failed: {e}")))?;
    let (read_half, mut write_half) = stream.split();
    let mut reader = BufReader::new(read_half);

    read_reply(&mut reader).await?;
    command(&mut write_half, &mut reader, &format!("EHLO ad-ops-hub\r\n")).await?;
    command(&mut write_half, &mut reader, "AUTH LOGIN\r\n").await?;
    command(&mut write_half, &mut reader, &format!("{}\r\n", BASE64.encode(&config.username))).await?;
    command(&mut write_half, &mut reader, &format!("{}\r\n", BASE64.encode(&config.password))).await?;
    command(&mut write_half, &mut reader, &format!("MAIL FROM:<{}>\r\n", config.from)).await?;
    command(&mut write_half, &mut reader, &format!("RCPT TO:<{to}>\r\n")).await?;
    command(&mut write_half, &mut reader, "DATA\r\n").await?;

    let message = format!(
        "From: {}\r\nTo: {}\r\nSubject: {}\r\n\r\n{}\r\n.\r\n",
        config.from, to, subject, body
    );
    write_half
        .write_all(message.as_bytes())
        .await
        .map_err(|e| NotifyError::DeliveryFailed(e.to_string()))?;
    read_reply(&mut reader).await?;

    command(&mut write_half, &mut reader, "QUIT\r\n").await.ok();
    Ok(())
}

async fn command<W: tokio::io::AsyncWrite + Unpin, R: tokio::io::AsyncBufRead + Unpin>(
    write_half: &mut W,
    reader: &mut R,
    line: &str,
) -> Result<String, NotifyError> {
    write_half
        .write_all(line.as_bytes())
        .await
        .map_err(|e| NotifyError::DeliveryFailed(e.to_string()))?;
    read_reply(reader).await
}

async fn read_reply<R: tokio::io::AsyncBufRead + Unpin>(reader: &mut R) -> Result<String, NotifyError> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .await
        .map_err(|e| NotifyError::DeliveryFailed(e.to_string()))?;
    if line.starts_with('4') || line.starts_with('5') {
        return Err(NotifyError::DeliveryFailed(format!("SMTP server rejected: {}", line.trim())));
    }
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_login_credentials_are_standard_base64() {
        assert_eq!(BASE64.encode("a"), "YQ==");
        assert_eq!(BASE64.encode("ab"), "YWI=");
        assert_eq!(BASE64.encode("abc"), "YWJj");
        assert_eq!(BASE64.encode(""), "");
    }

    #[test]
    fn unconfigured_smtp_is_rejected_before_connecting() {
        let config = SmtpConfig {
            host: String::new(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from: "ops@example.com".to_string(),
        };
        assert!(!config.is_configured());
    }
}
