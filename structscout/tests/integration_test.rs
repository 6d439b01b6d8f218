use anyhow::Result;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use structscout::{
    search, Cancellation, MatcherMetrics, PatternInfo, SearchConfig, SearchContext, SearchInput,
    SearchOutput, SearchRequest, SearchSummary,
};
use tempfile::{tempdir, TempDir};
use zip::write::FileOptions;

fn create_test_archive(dir: &TempDir, file_count: usize, lines_per_file: usize) -> Result<PathBuf> {
    let path = dir.path().join("repo.zip");
    let mut writer = zip::ZipWriter::new(File::create(&path)?);
    for i in 0..file_count {
        writer.start_file(format!("src/test_{}.txt", i), FileOptions::default())?;
        for j in 0..lines_per_file {
            writeln!(writer, "Line {} in file {}: TODO implement this", j, i)?;
            writeln!(writer, "Another line {} in file {}: nothing special", j, i)?;
            writeln!(writer, "FIXME: This is a bug in file {} line {}", i, j)?;
        }
    }
    writer.start_file("docs/notes.md", FileOptions::default())?;
    writeln!(writer, "todo: write docs")?;
    writer.finish()?;
    Ok(path)
}

fn run(pattern: PatternInfo, archive: PathBuf) -> Result<(SearchSummary, SearchOutput)> {
    let config = SearchConfig::default();
    let metrics = MatcherMetrics::new();
    let cancel = Cancellation::new();
    let ctx = SearchContext::new(&config, &metrics, &cancel);
    let mut output = SearchOutput::new();
    let summary = search(
        &ctx,
        SearchRequest {
            pattern,
            input: SearchInput::Archive(archive),
        },
        &mut output,
    )?;
    Ok((summary, output))
}

#[test]
fn test_literal_pattern() -> Result<()> {
    let dir = tempdir()?;
    let archive = create_test_archive(&dir, 10, 100)?;

    let (summary, output) = run(PatternInfo::literal("TODO"), archive)?;
    // Case-insensitive by default, so the notes file matches too.
    assert_eq!(summary.files, 11);
    assert_eq!(summary.matches, 10 * 100 + 1);
    assert_eq!(output.paths()[10], "docs/notes.md");
    Ok(())
}

#[test]
fn test_regex_pattern() -> Result<()> {
    let dir = tempdir()?;
    let archive = create_test_archive(&dir, 10, 100)?;

    let (summary, output) = run(PatternInfo::regex(r"FIXME:.*bug.*line \d+"), archive)?;
    assert_eq!(summary.files, 10);
    assert_eq!(summary.matches, 10 * 100);

    let first = &output.file_matches[0].chunk_matches[0];
    assert_eq!(first.content, "FIXME: This is a bug in file 0 line 0");
    assert_eq!(first.content_start.line, 2);
    Ok(())
}

#[test]
fn test_case_sensitive_pattern_with_path_filter() -> Result<()> {
    let dir = tempdir()?;
    let archive = create_test_archive(&dir, 3, 2)?;

    let pattern = PatternInfo {
        is_case_sensitive: true,
        include_patterns: vec![r"^src/".to_string()],
        exclude_pattern: Some(r"test_1\.txt$".to_string()),
        ..PatternInfo::literal("TODO")
    };
    let (summary, output) = run(pattern, archive)?;
    assert_eq!(output.paths(), vec!["src/test_0.txt", "src/test_2.txt"]);
    assert_eq!(summary.matches, 4);
    Ok(())
}

#[test]
fn test_word_match() -> Result<()> {
    let dir = tempdir()?;
    let archive = create_test_archive(&dir, 2, 1)?;

    let (summary, _) = run(
        PatternInfo {
            is_word_match: true,
            ..PatternInfo::literal("lin")
        },
        archive.clone(),
    )?;
    assert_eq!(summary.files, 0);

    let (summary, _) = run(
        PatternInfo {
            is_word_match: true,
            ..PatternInfo::literal("line")
        },
        archive,
    )?;
    assert_eq!(summary.files, 2);
    Ok(())
}

#[test]
fn test_limit() -> Result<()> {
    let dir = tempdir()?;
    let archive = create_test_archive(&dir, 10, 1)?;

    let (summary, output) = run(
        PatternInfo {
            limit: 4,
            ..PatternInfo::literal("FIXME")
        },
        archive,
    )?;
    assert_eq!(summary.files, 4);
    assert!(summary.limit_hit);
    assert_eq!(output.paths()[0], "src/test_0.txt");
    Ok(())
}
