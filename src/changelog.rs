//! Human-readable summary of a branch diff, used when sharing a review
//! request. Small diffs list every file; larger ones aggregate by
//! directory so the message stays readable.

/// One parsed `git diff --numstat` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub added: String,
    pub removed: String,
    pub path: String,
}

/// Render the summary for a diff given raw numstat and shortstat output.
///
/// Up to five changed files are listed individually in numstat order as
/// `<path> | <added>+ <removed>-`; six or more collapse into the top five
/// directories by file count (ties broken alphabetically). The shortstat
/// line closes the summary either way.
pub fn summarize(numstat: &str, shortstat: &str) -> String {
    let changes = parse_numstat(numstat);

    let mut lines: Vec<String> = if changes.len() > 5 {
        directory_counts(&changes)
            .into_iter()
            .take(5)
            .map(|(dir, count)| {
                let plural = if count > 1 { "s" } else { "" };
                format!("{dir} ({count} file{plural})")
            })
            .collect()
    } else {
        changes
            .iter()
            .map(|change| {
                format!(
                    "{} | {}+ {}-",
                    change.path, change.added, change.removed
                )
            })
            .collect()
    };

    let stats = shortstat.trim();
    if !stats.is_empty() {
        lines.push(stats.to_string());
    }
    lines.join("\n")
}

/// Added/removed counts stay as text: binary files report `-` and the
/// summary passes that through untouched.
pub fn parse_numstat(numstat: &str) -> Vec<FileChange> {
    numstat
        .lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let added = tokens.next()?;
            let removed = tokens.next()?;
            let path = tokens.next()?;
            Some(FileChange {
                added: added.to_string(),
                removed: removed.to_string(),
                path: path.to_string(),
            })
        })
        .collect()
}

/// File count per parent directory, sorted by descending count with an
/// alphabetical tie-break. A top-level file counts as its own group.
fn directory_counts(changes: &[FileChange]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for change in changes {
        let dir = parent_directory(&change.path);
        match counts.iter_mut().find(|(name, _)| name == dir) {
            Some((_, count)) => *count += 1,
            None => counts.push((dir.to_string(), 1)),
        }
    }
    counts.sort_by(|(a_dir, a_count), (b_dir, b_count)| {
        b_count.cmp(a_count).then_with(|| a_dir.cmp(b_dir))
    });
    counts
}

fn parent_directory(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or(path)
}
