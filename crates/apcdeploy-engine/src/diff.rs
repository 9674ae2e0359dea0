//! Diff Engine - line-based unified diffs of canonical content
//!
//! The comparison is pure: `has_changes` is exactly `remote != local`, and
//! the unified text is produced from a longest-common-subsequence alignment
//! of the two inputs' lines.

use serde::{Deserialize, Serialize};

/// Lines of unchanged context around each hunk
pub const CONTEXT_LINES: usize = 3;

const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// Result of comparing local and remote content
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffResult {
    pub has_changes: bool,
    /// Empty when there are no changes
    pub unified_diff: String,
    /// Lines only in the local content
    pub additions: usize,
    /// Lines only in the remote content
    pub deletions: usize,
}

/// Compare local against remote with default `remote`/`local` labels.
pub fn compare(local: &str, remote: &str) -> DiffResult {
    compare_labeled(local, remote, "remote", "local")
}

/// Compare local against remote; the diff reads as remote -> local.
pub fn compare_labeled(
    local: &str,
    remote: &str,
    remote_label: &str,
    local_label: &str,
) -> DiffResult {
    if local == remote {
        return DiffResult::default();
    }

    let old: Vec<&str> = remote.split_inclusive('\n').collect();
    let new: Vec<&str> = local.split_inclusive('\n').collect();
    let ops = align(&old, &new);

    let additions = ops.iter().filter(|op| matches!(op, Op::Insert(_))).count();
    let deletions = ops.iter().filter(|op| matches!(op, Op::Delete(_))).count();

    let mut out = String::new();
    out.push_str(&format!("--- {}\n+++ {}\n", remote_label, local_label));
    for hunk in hunks(&ops) {
        render_hunk(&mut out, &ops[hunk.start..hunk.end], &hunk, &old, &new);
    }

    DiffResult {
        has_changes: true,
        unified_diff: out,
        additions,
        deletions,
    }
}

/// One step of the alignment, holding line indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal(usize, usize),
    Delete(usize),
    Insert(usize),
}

/// Largest LCS table, in cells, before alignment falls back to a replace
pub const MAX_ALIGN_CELLS: usize = 1 << 22;

/// Align two line sequences with an LCS table.
///
/// Common prefix and suffix are matched up front so the table only covers
/// the differing middle. A middle larger than [`MAX_ALIGN_CELLS`] is emitted
/// as one delete-then-insert block, keeping memory linear.
fn align(old: &[&str], new: &[&str]) -> Vec<Op> {
    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];
    let (n, m) = (old_mid.len(), new_mid.len());

    let mut ops = Vec::with_capacity(prefix + n + m + suffix);
    ops.extend((0..prefix).map(|k| Op::Equal(k, k)));

    let cells = (n + 1).saturating_mul(m + 1);
    if cells > MAX_ALIGN_CELLS {
        ops.extend((0..n).map(|i| Op::Delete(prefix + i)));
        ops.extend((0..m).map(|j| Op::Insert(prefix + j)));
    } else {
        align_middle(old_mid, new_mid, prefix, &mut ops);
    }

    let old_tail = old.len() - suffix;
    let new_tail = new.len() - suffix;
    ops.extend((0..suffix).map(|k| Op::Equal(old_tail + k, new_tail + k)));
    ops
}

/// LCS alignment of the differing middle, offset by `prefix`
fn align_middle(old_mid: &[&str], new_mid: &[&str], prefix: usize, ops: &mut Vec<Op>) {
    let (n, m) = (old_mid.len(), new_mid.len());

    // lcs[i][j] = LCS length of old_mid[i..] and new_mid[j..]
    let width = m + 1;
    let mut lcs = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if old_mid[i] == new_mid[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        if i < n && j < m && old_mid[i] == new_mid[j] {
            ops.push(Op::Equal(prefix + i, prefix + j));
            i += 1;
            j += 1;
        } else if j == m || (i < n && lcs[(i + 1) * width + j] >= lcs[i * width + j + 1]) {
            ops.push(Op::Delete(prefix + i));
            i += 1;
        } else {
            ops.push(Op::Insert(prefix + j));
            j += 1;
        }
    }
}

/// A hunk as a range of ops plus its header coordinates
#[derive(Debug)]
struct Hunk {
    start: usize,
    end: usize,
    old_start: usize,
    old_len: usize,
    new_start: usize,
    new_len: usize,
}

fn hunks(ops: &[Op]) -> Vec<Hunk> {
    let changes: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| !matches!(op, Op::Equal(..)))
        .map(|(idx, _)| idx)
        .collect();

    // Group changes whose context would overlap or touch
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for &idx in &changes {
        let start = idx.saturating_sub(CONTEXT_LINES);
        let end = (idx + 1 + CONTEXT_LINES).min(ops.len());
        match ranges.last_mut() {
            Some(last) if start <= last.1 => last.1 = end,
            _ => ranges.push((start, end)),
        }
    }

    // Lines consumed on each side before each op
    let mut old_pos = Vec::with_capacity(ops.len());
    let mut new_pos = Vec::with_capacity(ops.len());
    let (mut o, mut n) = (0, 0);
    for op in ops {
        old_pos.push(o);
        new_pos.push(n);
        match op {
            Op::Equal(..) => {
                o += 1;
                n += 1;
            }
            Op::Delete(_) => o += 1,
            Op::Insert(_) => n += 1,
        }
    }

    ranges
        .into_iter()
        .map(|(start, end)| {
            let slice = &ops[start..end];
            let old_len = slice
                .iter()
                .filter(|op| !matches!(op, Op::Insert(_)))
                .count();
            let new_len = slice
                .iter()
                .filter(|op| !matches!(op, Op::Delete(_)))
                .count();
            // An empty side points at the line before the hunk
            let old_start = if old_len == 0 { old_pos[start] } else { old_pos[start] + 1 };
            let new_start = if new_len == 0 { new_pos[start] } else { new_pos[start] + 1 };
            Hunk {
                start,
                end,
                old_start,
                old_len,
                new_start,
                new_len,
            }
        })
        .collect()
}

fn range_header(start: usize, len: usize) -> String {
    if len == 1 {
        start.to_string()
    } else {
        format!("{},{}", start, len)
    }
}

fn render_hunk(out: &mut String, ops: &[Op], hunk: &Hunk, old: &[&str], new: &[&str]) {
    out.push_str(&format!(
        "@@ -{} +{} @@\n",
        range_header(hunk.old_start, hunk.old_len),
        range_header(hunk.new_start, hunk.new_len)
    ));

    for op in ops {
        let (marker, line) = match *op {
            Op::Equal(i, _) => (' ', old[i]),
            Op::Delete(i) => ('-', old[i]),
            Op::Insert(j) => ('+', new[j]),
        };
        out.push(marker);
        out.push_str(line);
        if !line.ends_with('\n') {
            out.push('\n');
            out.push_str(NO_NEWLINE_MARKER);
            out.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_has_no_changes() {
        let result = compare("a\nb\n", "a\nb\n");
        assert!(!result.has_changes);
        assert!(result.unified_diff.is_empty());
        assert_eq!(result.additions + result.deletions, 0);
    }

    #[test]
    fn test_single_changed_line() {
        let remote = "{\n  \"key\": \"value2\"\n}\n";
        let local = "{\n  \"key\": \"value1\"\n}\n";
        let result = compare(local, remote);

        assert!(result.has_changes);
        assert_eq!(result.additions, 1);
        assert_eq!(result.deletions, 1);
        assert_eq!(
            result.unified_diff,
            "--- remote\n+++ local\n@@ -1,3 +1,3 @@\n {\n-  \"key\": \"value2\"\n+  \"key\": \"value1\"\n }\n"
        );
    }

    #[test]
    fn test_context_is_limited_and_hunks_split() {
        let remote: String = (1..=20).map(|i| format!("line{}\n", i)).collect();
        let local = remote.replace("line2\n", "LINE2\n").replace("line18\n", "LINE18\n");
        let result = compare(&local, &remote);

        let headers: Vec<&str> = result
            .unified_diff
            .lines()
            .filter(|l| l.starts_with("@@"))
            .collect();
        assert_eq!(headers, vec!["@@ -1,5 +1,5 @@", "@@ -15,6 +15,6 @@"]);
        assert!(!result.unified_diff.contains(" line10\n"));
    }

    #[test]
    fn test_nearby_changes_share_a_hunk() {
        let remote: String = (1..=10).map(|i| format!("{}\n", i)).collect();
        let local = remote.replace("3\n", "three\n").replace("7\n", "seven\n");
        let result = compare(&local, &remote);

        let hunk_count = result.unified_diff.matches("@@ -").count();
        assert_eq!(hunk_count, 1);
        assert!(result.unified_diff.contains("@@ -1,10 +1,10 @@"));
    }

    #[test]
    fn test_added_to_empty_remote() {
        let result = compare("a\nb\n", "");
        assert!(result.has_changes);
        assert_eq!(result.additions, 2);
        assert_eq!(result.deletions, 0);
        assert!(result.unified_diff.contains("@@ -0,0 +1,2 @@\n+a\n+b\n"));
    }

    #[test]
    fn test_pure_deletion() {
        let result = compare("a\nc\n", "a\nb\nc\n");
        assert_eq!(result.deletions, 1);
        assert!(result.unified_diff.contains("@@ -1,3 +1,2 @@\n a\n-b\n c\n"));
    }

    #[test]
    fn test_missing_trailing_newline() {
        let result = compare("a\nb", "a\nb\n");
        assert!(result.has_changes);
        assert!(result
            .unified_diff
            .contains("-b\n+b\n\\ No newline at end of file\n"));
    }

    #[test]
    fn test_reindented_large_input_replaces_whole_block() {
        let remote: String = (0..10_000).map(|i| format!("  key{}: {}\n", i, i)).collect();
        let local: String = (0..10_000).map(|i| format!("    key{}: {}\n", i, i)).collect();
        let result = compare(&local, &remote);

        assert_eq!(result.additions, 10_000);
        assert_eq!(result.deletions, 10_000);
        let headers: Vec<&str> = result
            .unified_diff
            .lines()
            .filter(|l| l.starts_with("@@"))
            .collect();
        assert_eq!(headers, vec!["@@ -1,10000 +1,10000 @@"]);
    }

    #[test]
    fn test_large_input_keeps_shared_prefix_and_suffix() {
        let head: String = (0..5_000).map(|i| format!("head{}\n", i)).collect();
        let tail: String = (0..5_000).map(|i| format!("tail{}\n", i)).collect();
        let old_mid: String = (0..3_000).map(|i| format!("a{}\n", i)).collect();
        let new_mid: String = (0..3_000).map(|i| format!("b{}\n", i)).collect();
        let remote = format!("{head}{old_mid}{tail}");
        let local = format!("{head}{new_mid}{tail}");
        let result = compare(&local, &remote);

        assert_eq!(result.additions, 3_000);
        assert_eq!(result.deletions, 3_000);
        assert!(result.unified_diff.contains("@@ -4998,3006 +4998,3006 @@\n head4997\n"));
        assert!(!result.unified_diff.contains("head4996"));
        assert!(!result.unified_diff.contains("tail3\n"));
    }

    #[test]
    fn test_custom_labels() {
        let result = compare_labeled("x\n", "y\n", "deployed (v3)", "data.json");
        assert!(result.unified_diff.starts_with("--- deployed (v3)\n+++ data.json\n"));
    }
}
