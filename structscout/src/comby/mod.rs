/// The contract with the external `comby` matcher.
///
/// comby is treated as a black box: this module only knows how to render its
/// command line ([`Args`]), how to read what it prints ([`protocol`]), how to
/// approximate one of its patterns with a regular expression ([`pattern`]) and
/// how to run it with its pipes wired up ([`process`]).
///
/// Output is one JSON record per line. With [`ResultKind::MatchOnly`] each record
/// lists a file's match ranges; with [`ResultKind::ChunkMatches`] comby also
/// groups them into whole-line chunks itself. Either way lines and columns are
/// 1-based and offsets are bytes into the record's file.
pub mod pattern;
pub mod process;
pub mod protocol;

use crossbeam_channel::Receiver;
use std::fmt;
use std::path::PathBuf;

use crate::archive::TarEntry;

/// Where comby reads the files to search
pub enum Input {
    /// A zip archive on disk (`-zip <path>`)
    ZipPath(PathBuf),
    /// A directory on disk (`-directory <path>`)
    DirPath(PathBuf),
    /// A single file's content written to stdin (`-stdin`)
    FileContent(Vec<u8>),
    /// A tar stream written to stdin as file events arrive (`-tar`)
    Tar(Receiver<TarEntry>),
}

impl Input {
    /// Short name used in log messages and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ZipPath(_) => "zip",
            Self::DirPath(_) => "directory",
            Self::FileContent(_) => "stdin",
            Self::Tar(_) => "tar",
        }
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZipPath(path) => f.debug_tuple("ZipPath").field(path).finish(),
            Self::DirPath(path) => f.debug_tuple("DirPath").field(path).finish(),
            Self::FileContent(content) => write!(f, "FileContent({} bytes)", content.len()),
            Self::Tar(_) => f.write_str("Tar"),
        }
    }
}

/// What comby prints for every file with matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// Match ranges only
    MatchOnly,
    /// Match ranges grouped into whole-line chunks with their content
    ChunkMatches,
}

/// Arguments for one comby invocation
#[derive(Debug)]
pub struct Args {
    pub input: Input,
    /// Matcher id, a representative file extension such as `.go`
    pub matcher: String,
    pub match_template: String,
    /// Always empty for searches
    pub rewrite_template: String,
    pub rule: Option<String>,
    /// Restrict comby to these paths; empty means every file
    pub file_patterns: Vec<String>,
    /// Worker processes; 0 runs comby sequentially
    pub num_workers: usize,
    pub result_kind: ResultKind,
}

impl Args {
    /// Renders the arguments as comby's command line, without the program name
    pub fn to_command_args(&self) -> Vec<String> {
        let mut args = vec![self.match_template.clone(), self.rewrite_template.clone()];

        if let Some(rule) = self.rule.as_deref().filter(|r| !r.is_empty()) {
            args.extend(["-rule".to_string(), rule.to_string()]);
        }

        if !self.file_patterns.is_empty() {
            args.extend(["-f".to_string(), self.file_patterns.join(",")]);
        }

        args.push("-json-lines".to_string());

        match self.result_kind {
            ResultKind::MatchOnly => args.push("-match-only".to_string()),
            ResultKind::ChunkMatches => args.extend([
                "-match-only".to_string(),
                "-chunk-matches".to_string(),
                "0".to_string(),
            ]),
        }

        if self.num_workers == 0 {
            args.push("-sequential".to_string());
        } else {
            args.extend(["-jobs".to_string(), self.num_workers.to_string()]);
        }

        if !self.matcher.is_empty() {
            args.extend(["-matcher".to_string(), self.matcher.clone()]);
        }

        match &self.input {
            Input::ZipPath(path) => {
                args.extend(["-zip".to_string(), path.display().to_string()])
            }
            Input::DirPath(path) => {
                args.extend(["-directory".to_string(), path.display().to_string()])
            }
            Input::FileContent(_) => args.push("-stdin".to_string()),
            Input::Tar(_) => args.push("-tar".to_string()),
        }

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(input: Input, result_kind: ResultKind) -> Args {
        Args {
            input,
            matcher: ".go".to_string(),
            match_template: "fmt.Println(:[x])".to_string(),
            rewrite_template: String::new(),
            rule: None,
            file_patterns: vec![],
            num_workers: 4,
            result_kind,
        }
    }

    #[test]
    fn test_zip_match_only_args() {
        let rendered = args(Input::ZipPath(PathBuf::from("/tmp/repo.zip")), ResultKind::MatchOnly)
            .to_command_args();
        assert_eq!(
            rendered,
            vec![
                "fmt.Println(:[x])",
                "",
                "-json-lines",
                "-match-only",
                "-jobs",
                "4",
                "-matcher",
                ".go",
                "-zip",
                "/tmp/repo.zip",
            ]
        );
    }

    #[test]
    fn test_tar_chunk_args() {
        let (_tx, rx) = crossbeam_channel::unbounded();
        let rendered = args(Input::Tar(rx), ResultKind::ChunkMatches).to_command_args();
        assert_eq!(
            &rendered[2..],
            &[
                "-json-lines",
                "-match-only",
                "-chunk-matches",
                "0",
                "-jobs",
                "4",
                "-matcher",
                ".go",
                "-tar",
            ]
        );
    }

    #[test]
    fn test_rule_file_patterns_and_sequential() {
        let mut a = args(Input::DirPath(PathBuf::from("src")), ResultKind::MatchOnly);
        a.rule = Some("where :[x] == \"a\"".to_string());
        a.file_patterns = vec!["a.go".to_string(), "b/c.go".to_string()];
        a.num_workers = 0;
        a.matcher = String::new();

        let rendered = a.to_command_args();
        assert_eq!(
            rendered,
            vec![
                "fmt.Println(:[x])",
                "",
                "-rule",
                "where :[x] == \"a\"",
                "-f",
                "a.go,b/c.go",
                "-json-lines",
                "-match-only",
                "-sequential",
                "-directory",
                "src",
            ]
        );
    }

    #[test]
    fn test_empty_rule_is_omitted() {
        let mut a = args(Input::FileContent(b"x".to_vec()), ResultKind::MatchOnly);
        a.rule = Some(String::new());
        let rendered = a.to_command_args();
        assert!(!rendered.contains(&"-rule".to_string()));
        assert_eq!(rendered.last().unwrap(), "-stdin");
    }

    #[test]
    fn test_input_debug_and_kind() {
        let input = Input::FileContent(vec![0; 12]);
        assert_eq!(format!("{:?}", input), "FileContent(12 bytes)");
        assert_eq!(input.kind(), "stdin");
        assert_eq!(Input::ZipPath(PathBuf::from("a.zip")).kind(), "zip");
    }
}
