use crate::sizes::{KIB, MIB};
use argh::FromArgs;
use std::sync::LazyLock;

fn byte_size(size: &str) -> Result<Option<usize>, String> {
    let size = size.trim().to_ascii_lowercase();
    let (digits, scale) = if let Some(digits) = size.strip_suffix("kib").or(size.strip_suffix('k')) {
        (digits, KIB)
    } else if let Some(digits) = size.strip_suffix("mib").or(size.strip_suffix('m')) {
        (digits, MIB)
    } else {
        (size.as_str(), 1)
    };

    Ok(digits
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_mul(scale)))
}

/// Engine arguments
#[derive(Debug, Default, FromArgs)]
pub struct EngineArgs {
    #[argh(switch, hidden_help)]
    pub synchronous: bool,

    #[argh(option, hidden_help, from_str_fn(byte_size))]
    pub rendering_buffer_size: Option<Option<usize>>,
    #[argh(option, hidden_help, from_str_fn(byte_size))]
    pub resource_buffer_size: Option<Option<usize>>,
}

impl EngineArgs {
    fn init() -> Option<EngineArgs> {
        let mut args = std::env::args();
        let cmd_name = args.next()?;
        let args: Vec<String> = args.collect();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        EngineArgs::from_args(&[&cmd_name], &args).ok()
    }

    pub fn get() -> &'static EngineArgs {
        static INSTANCE: LazyLock<EngineArgs> =
            LazyLock::new(|| EngineArgs::init().unwrap_or_default());
        &INSTANCE
    }

    pub fn rendering_buffer_size(&self) -> Option<usize> {
        self.rendering_buffer_size.flatten()
    }

    pub fn resource_buffer_size(&self) -> Option<usize> {
        self.resource_buffer_size.flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_byte_sizes_with_suffixes() {
        assert_eq!(byte_size("512"), Ok(Some(512)));
        assert_eq!(byte_size("64k"), Ok(Some(64 * KIB)));
        assert_eq!(byte_size("2MiB"), Ok(Some(2 * MIB)));
        assert_eq!(byte_size("lots"), Ok(None));
    }

    #[test]
    fn parses_flags() {
        let args = EngineArgs::from_args(
            &["app"],
            &["--synchronous", "--rendering-buffer-size", "128k"],
        )
        .unwrap();

        assert!(args.synchronous);
        assert_eq!(args.rendering_buffer_size(), Some(128 * KIB));
        assert_eq!(args.resource_buffer_size(), None);
    }
}
