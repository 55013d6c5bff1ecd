//! Line-level three-way merge of append-only log files.
//!
//! Every log line is a complete, self-contained JSON record, so a
//! line-level three-way merge is safe: there's no need to understand the
//! content of a line to merge it correctly, only whether it moved. This
//! mirrors a textbook `diff3`, built on `similar`'s line diffing rather
//! than hand-rolled LCS.

use std::ops::Range;

use similar::{capture_diff_slices, Algorithm, DiffOp};

use crate::error::Error;

/// The result of a three-way merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The merged lines. When `has_conflicts` is true, conflicting regions
    /// are wrapped in `<<<<<<< left` / `=======` / `>>>>>>> right` markers
    /// and the caller must not treat this as importable content.
    pub lines: Vec<String>,
    pub has_conflicts: bool,
}

#[derive(Debug, Clone)]
struct Hunk {
    base_range: Range<usize>,
    replacement: Vec<String>,
}

fn hunks_over_base(base: &[&str], other: &[&str]) -> Vec<Hunk> {
    let ops = capture_diff_slices(Algorithm::Myers, base, other);
    let mut hunks = Vec::new();
    for op in ops {
        match op {
            DiffOp::Equal { .. } => {}
            DiffOp::Delete {
                old_index, old_len, ..
            } => hunks.push(Hunk {
                base_range: old_index..old_index + old_len,
                replacement: Vec::new(),
            }),
            DiffOp::Insert {
                old_index,
                new_index,
                new_len,
            } => hunks.push(Hunk {
                base_range: old_index..old_index,
                replacement: other[new_index..new_index + new_len]
                    .iter()
                    .map(|s| (*s).to_string())
                    .collect(),
            }),
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => hunks.push(Hunk {
                base_range: old_index..old_index + old_len,
                replacement: other[new_index..new_index + new_len]
                    .iter()
                    .map(|s| (*s).to_string())
                    .collect(),
            }),
        }
    }
    hunks
}

fn ranges_overlap(a: &Range<usize>, b: &Range<usize>) -> bool {
    // Two empty (pure-insertion) ranges at the same point don't "overlap"
    // in the conflicting sense unless their content differs; that's
    // handled by the caller comparing replacements.
    a.start < b.end && b.start < a.end
}

/// Three-way merge `left` and `right`, both derived from `base`, at line
/// granularity.
///
/// # Errors
///
/// Returns [`Error::AmbiguousMarker`] if any input line already contains a
/// conflict marker sequence (`<<<<<<<`, `=======`, `>>>>>>>`), since that
/// would make the merge's own markers unparseable.
pub fn merge_lines(base: &str, left: &str, right: &str) -> Result<MergeOutcome, Error> {
    for text in [base, left, right] {
        for line in text.lines() {
            if line.starts_with("<<<<<<<")
                || line.starts_with("=======")
                || line.starts_with(">>>>>>>")
            {
                return Err(Error::AmbiguousMarker {
                    line: line.to_string(),
                });
            }
        }
    }

    let base_lines: Vec<&str> = base.lines().collect();
    let left_lines: Vec<&str> = left.lines().collect();
    let right_lines: Vec<&str> = right.lines().collect();

    let left_hunks = hunks_over_base(&base_lines, &left_lines);
    let right_hunks = hunks_over_base(&base_lines, &right_lines);

    let mut out = Vec::with_capacity(base_lines.len());
    let mut has_conflicts = false;
    let mut cursor = 0usize;

    let mut li = 0usize;
    let mut ri = 0usize;

    loop {
        let next_left = left_hunks.get(li);
        let next_right = right_hunks.get(ri);

        let (lh, rh) = match (next_left, next_right) {
            (None, None) => break,
            (Some(l), None) => (Some(l), None),
            (None, Some(r)) => (None, Some(r)),
            (Some(l), Some(r)) => {
                if l.base_range.start <= r.base_range.start {
                    (Some(l), None)
                } else {
                    (None, Some(r))
                }
            }
        };

        if let (Some(l), Some(r)) = (next_left, next_right) {
            if ranges_overlap(&l.base_range, &r.base_range)
                || (l.base_range == r.base_range && l.replacement != r.replacement)
            {
                // Flush unchanged lines up to the overlap.
                let start = l.base_range.start.min(r.base_range.start).max(cursor);
                out.extend(base_lines[cursor..start].iter().map(|s| (*s).to_string()));
                let end = l.base_range.end.max(r.base_range.end);

                if l.replacement == r.replacement {
                    out.extend(l.replacement.iter().cloned());
                } else {
                    has_conflicts = true;
                    out.push("<<<<<<< left".to_string());
                    out.extend(l.replacement.iter().cloned());
                    out.push("=======".to_string());
                    out.extend(r.replacement.iter().cloned());
                    out.push(">>>>>>> right".to_string());
                }
                cursor = end;
                li += 1;
                ri += 1;
                continue;
            }
        }

        if let Some(l) = lh {
            out.extend(
                base_lines[cursor..l.base_range.start.max(cursor)]
                    .iter()
                    .map(|s| (*s).to_string()),
            );
            out.extend(l.replacement.iter().cloned());
            cursor = l.base_range.end.max(cursor);
            li += 1;
        } else if let Some(r) = rh {
            out.extend(
                base_lines[cursor..r.base_range.start.max(cursor)]
                    .iter()
                    .map(|s| (*s).to_string()),
            );
            out.extend(r.replacement.iter().cloned());
            cursor = r.base_range.end.max(cursor);
            ri += 1;
        }
    }

    out.extend(base_lines[cursor..].iter().map(|s| (*s).to_string()));

    Ok(MergeOutcome {
        lines: out,
        has_conflicts,
    })
}
