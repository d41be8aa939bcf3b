use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::dispatch::error::DispatchError;
use crate::dispatch::registry::Provider;

/// Flags every provider entry point understands.
#[derive(Debug, Clone, Default)]
pub struct CommonOptions {
    pub config: Option<PathBuf>,
    pub output_suffix: Option<String>,
    pub extensions: Vec<String>,
    pub recursive: bool,
    pub verbose: bool,
}

/// A fully resolved provider command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn build(provider: &Provider, input: &str, options: &CommonOptions, extra: &[String]) -> Self {
        let mut args = vec![
            input.to_string(),
            "--parser-name".to_string(),
            provider.name.clone(),
        ];

        if let Some(ref config) = options.config {
            args.push("--config".to_string());
            args.push(config.to_string_lossy().to_string());
        }

        if let Some(ref suffix) = options.output_suffix {
            args.push("--output-suffix".to_string());
            args.push(suffix.clone());
        }

        // Single-value form: extra positionals must not be taken as extensions
        for ext in &options.extensions {
            args.push(format!("--extensions={ext}"));
        }

        if options.recursive {
            args.push("--recursive".to_string());
        }

        if options.verbose {
            args.push("--verbose".to_string());
        }

        args.extend(extra.iter().cloned());

        Self {
            program: provider.entry_point(),
            args,
        }
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.to_string_lossy().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the provider, streaming its output, and return its exit code.
    pub async fn run(&self) -> Result<i32, DispatchError> {
        if !self.program.is_file() {
            return Err(DispatchError::MissingEntryPoint(self.program.clone()));
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| DispatchError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (out, err) = tokio::join!(
            stream_lines(stdout, ""),
            stream_lines(stderr, "STDERR: ")
        );
        out?;
        err?;

        let status = child.wait().await?;
        tracing::debug!(%status, program = %self.program.display(), "provider exited");

        // Killed by a signal: no code to forward
        Ok(status.code().unwrap_or(1))
    }
}

async fn stream_lines<R>(stream: Option<R>, prefix: &str) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return Ok(());
    };

    // Providers may emit bytes that are not UTF-8; print them lossily and keep draining
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        println!("{prefix}{}", String::from_utf8_lossy(trim_line_ending(&buf)));
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> Provider {
        Provider {
            name: "llamaparse".to_string(),
            dir: PathBuf::from("parsers/llamaparse"),
        }
    }

    #[test]
    fn forwards_common_flags_before_extra_args() {
        let options = CommonOptions {
            config: Some(PathBuf::from("parsers/llamaparse/configs/fast_mode.json")),
            output_suffix: Some("my_run".to_string()),
            extensions: vec![".pdf".to_string(), ".docx".to_string()],
            recursive: true,
            verbose: false,
        };
        let extra = vec!["--concurrency".to_string(), "4".to_string()];

        let invocation = Invocation::build(&provider(), "input_dir", &options, &extra);

        assert_eq!(invocation.program, PathBuf::from("parsers/llamaparse/parse"));
        assert_eq!(
            invocation.args,
            vec![
                "input_dir",
                "--parser-name",
                "llamaparse",
                "--config",
                "parsers/llamaparse/configs/fast_mode.json",
                "--output-suffix",
                "my_run",
                "--extensions=.pdf",
                "--extensions=.docx",
                "--recursive",
                "--concurrency",
                "4",
            ]
        );
    }

    #[test]
    fn minimal_invocation_only_names_the_parser() {
        let invocation = Invocation::build(&provider(), "doc.pdf", &CommonOptions::default(), &[]);
        assert_eq!(invocation.args, vec!["doc.pdf", "--parser-name", "llamaparse"]);
        assert_eq!(
            invocation.display(),
            "parsers/llamaparse/parse doc.pdf --parser-name llamaparse"
        );
    }

    #[test]
    fn line_endings_are_trimmed() {
        assert_eq!(trim_line_ending(b"page 1\r\n"), b"page 1");
        assert_eq!(trim_line_ending(b"page 2\n"), b"page 2");
        assert_eq!(trim_line_ending(b"tail"), b"tail");
    }

    #[tokio::test]
    async fn invalid_utf8_output_does_not_stop_streaming() {
        let output: &[u8] = b"caf\xe9\nafter\n";
        stream_lines(Some(output), "").await.unwrap();
    }

    #[tokio::test]
    async fn missing_entry_point_is_an_error() {
        let invocation = Invocation {
            program: PathBuf::from("/no/such/provider/parse"),
            args: vec![],
        };
        assert!(matches!(
            invocation.run().await,
            Err(DispatchError::MissingEntryPoint(_))
        ));
    }
}
