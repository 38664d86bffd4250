use crate::error::{Result, TorrentError};

pub const SET_USPEED_USAGE: &str = "set-uspeed <mbit>";

/// 帯域制限を操作するシェルコマンド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `set-uspeed <mbit>`
    SetUploadSpeed(u64),
    /// `stop-upload`
    StopUpload,
    /// `get-uspeed`
    GetUploadSpeed,
    /// `exit`
    Exit,
}

impl Command {
    /// 1行をコマンドに変換する。空行は `None`
    ///
    /// 引数の検証はここで行い、リミッタには正しい値だけを渡す。
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let mut parts = line.split_whitespace();
        let name = match parts.next() {
            Some(name) => name,
            None => return Ok(None),
        };
        let args: Vec<&str> = parts.collect();

        let command = match name {
            "set-uspeed" => {
                if args.len() != 1 {
                    return Err(TorrentError::Usage(SET_USPEED_USAGE));
                }
                Command::SetUploadSpeed(parse_mbit(args[0])?)
            }
            "stop-upload" => Command::StopUpload,
            "get-uspeed" => Command::GetUploadSpeed,
            "exit" | "quit" => Command::Exit,
            other => return Err(TorrentError::UnknownCommand(other.to_string())),
        };

        Ok(Some(command))
    }
}

fn parse_mbit(s: &str) -> Result<u64> {
    s.parse::<u64>().map_err(|_| {
        TorrentError::InvalidOption(format!(
            "Invalid speed: {}. Expected a non-negative integer (Mbit/s)",
            s
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() -> Result<()> {
        assert_eq!(Command::parse("set-uspeed 8")?, Some(Command::SetUploadSpeed(8)));
        assert_eq!(Command::parse("  set-uspeed   0 \n")?, Some(Command::SetUploadSpeed(0)));
        assert_eq!(Command::parse("stop-upload")?, Some(Command::StopUpload));
        assert_eq!(Command::parse("get-uspeed")?, Some(Command::GetUploadSpeed));
        assert_eq!(Command::parse("exit")?, Some(Command::Exit));
        Ok(())
    }

    #[test]
    fn test_blank_line() -> Result<()> {
        assert_eq!(Command::parse("")?, None);
        assert_eq!(Command::parse("   \t\n")?, None);
        Ok(())
    }

    #[test]
    fn test_set_uspeed_arity() {
        let err = Command::parse("set-uspeed").unwrap_err();
        assert_eq!(err.to_string(), "Usage: set-uspeed <mbit>");

        let err = Command::parse("set-uspeed 1 2").unwrap_err();
        assert!(matches!(err, TorrentError::Usage(_)));
    }

    #[test]
    fn test_set_uspeed_rejects_bad_numbers() {
        for arg in ["-1", "fast", "1.5", "99999999999999999999999"] {
            let err = Command::parse(&format!("set-uspeed {}", arg)).unwrap_err();
            assert!(matches!(err, TorrentError::InvalidOption(_)), "accepted {}", arg);
        }
    }

    #[test]
    fn test_unknown_command() {
        let err = Command::parse("start").unwrap_err();
        assert_eq!(err.to_string(), "Unknown command: start.");
    }
}
