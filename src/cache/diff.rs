const CONTEXT: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Equal,
    Delete,
    Insert,
}

/// Line-level unified diff between two buffers; empty when they are equal.
pub fn unified(from: &str, to: &str, before: &str, after: &str) -> String {
    if before == after {
        return String::new();
    }
    let a: Vec<&str> = before.split_inclusive('\n').collect();
    let b: Vec<&str> = after.split_inclusive('\n').collect();
    let edits = edit_script(&a, &b);

    let mut out = format!("--- {from}\n+++ {to}\n");
    let mut idx = 0;
    while idx < edits.len() {
        if edits[idx].0 == Op::Equal {
            idx += 1;
            continue;
        }
        let start = idx.saturating_sub(CONTEXT);
        let mut end = idx;
        let mut equal_run = 0;
        while end < edits.len() {
            if edits[end].0 == Op::Equal {
                if equal_run == CONTEXT * 2 {
                    break;
                }
                equal_run += 1;
            } else {
                equal_run = 0;
            }
            end += 1;
        }
        let end = end - equal_run.saturating_sub(CONTEXT);
        let hunk = &edits[start..end];
        let a_start = hunk.first().map(|e| e.1).unwrap_or(0);
        let b_start = hunk.first().map(|e| e.2).unwrap_or(0);
        let a_len = hunk.iter().filter(|e| e.0 != Op::Insert).count();
        let b_len = hunk.iter().filter(|e| e.0 != Op::Delete).count();
        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            a_start + usize::from(a_len > 0),
            a_len,
            b_start + usize::from(b_len > 0),
            b_len
        ));
        for (op, ai, bi) in hunk {
            let (marker, line) = match op {
                Op::Equal => (' ', a[*ai]),
                Op::Delete => ('-', a[*ai]),
                Op::Insert => ('+', b[*bi]),
            };
            out.push(marker);
            out.push_str(line);
            if !line.ends_with('\n') {
                out.push_str("\n\\ No newline at end of file\n");
            }
        }
        idx = end;
    }
    out
}

/// Longest-common-subsequence edit script over lines. Each entry carries
/// the current index into both inputs.
fn edit_script(a: &[&str], b: &[&str]) -> Vec<(Op, usize, usize)> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let (am, bm) = (&a[prefix..a.len() - suffix], &b[prefix..b.len() - suffix]);

    let mut table = vec![vec![0u32; bm.len() + 1]; am.len() + 1];
    for i in (0..am.len()).rev() {
        for j in (0..bm.len()).rev() {
            table[i][j] = if am[i] == bm[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut script: Vec<(Op, usize, usize)> = (0..prefix).map(|i| (Op::Equal, i, i)).collect();
    let (mut i, mut j) = (0, 0);
    while i < am.len() || j < bm.len() {
        if i < am.len() && j < bm.len() && am[i] == bm[j] {
            script.push((Op::Equal, prefix + i, prefix + j));
            i += 1;
            j += 1;
        } else if i < am.len() && (j == bm.len() || table[i + 1][j] >= table[i][j + 1]) {
            script.push((Op::Delete, prefix + i, prefix + j));
            i += 1;
        } else {
            script.push((Op::Insert, prefix + i, prefix + j));
            j += 1;
        }
    }
    let (a_tail, b_tail) = (a.len() - suffix, b.len() - suffix);
    script.extend((0..suffix).map(|k| (Op::Equal, a_tail + k, b_tail + k)));
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_buffers_have_no_diff() {
        assert_eq!(unified("a", "b", "x\ny\n", "x\ny\n"), "");
    }

    #[test]
    fn single_line_change_is_one_hunk() {
        let diff = unified("before", "after", "a\nb\nc\n", "a\nB\nc\n");
        assert_eq!(diff, "--- before\n+++ after\n@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n");
    }

    #[test]
    fn appended_line_without_newline_is_marked() {
        let diff = unified("before", "after", "x\n", "x\n}");
        assert!(diff.contains("+}\n\\ No newline at end of file\n"));
    }
}
