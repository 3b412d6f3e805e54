use crate::error::CompareError;
use phylotree::tree::Tree;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

/// Read the first tree of a Newick or Nexus file.
///
/// A zero-byte or whitespace-only file is an `EmptyTree`; a file that
/// cannot be read is an `Io` error.
pub fn read_tree_file<P: AsRef<Path>>(path: P) -> Result<Tree, CompareError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| CompareError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Err(CompareError::EmptyTree(format!("{} holds no tree", path.display())));
    }
    log::debug!("Read {} bytes from {}", content.len(), path.display());
    parse_newick(&content)
}

/// Parse the first tree of a Newick string (or of a Nexus `TREES` block).
///
/// Comments in square brackets (`[&R]`, BEAST `[&rate=...]`, FastTree
/// support annotations) are dropped, as is whitespace outside quoted
/// labels. The remaining text is checked for balanced brackets and a
/// single top-level clade before `phylotree` builds the tree.
pub fn parse_newick(text: &str) -> Result<Tree, CompareError> {
    if text.trim().is_empty() {
        return Err(CompareError::EmptyTree("no tree text".to_string()));
    }

    if is_nexus(text) {
        let block = extract_nexus_tree(text)?;
        let mut tree = parse_plain_newick(&block.newick)?;
        if !block.translate.is_empty() {
            rename_leaf_nodes(&mut tree, &block.translate);
        }
        return Ok(tree);
    }

    parse_plain_newick(text)
}

fn parse_plain_newick(text: &str) -> Result<Tree, CompareError> {
    let (clean, rest) = sanitize_newick(text)?;
    if !rest.trim().is_empty() {
        log::debug!("Ignoring {} bytes after the first tree", rest.len());
    }
    validate_structure(&clean)?;
    Tree::from_newick(&clean).map_err(|e| CompareError::Parse(e.to_string()))
}

/// Strip comments and unquoted whitespace up to the first `;`.
///
/// Single-quoted labels are rewritten with double quotes, the only quote
/// style `phylotree` understands, and a doubled `''` inside them becomes
/// one literal `'`. Whitespace between two characters of an unquoted
/// label is an error rather than being glued away. Returns the cleaned
/// tree (ending in `;`) and whatever followed it.
fn sanitize_newick(text: &str) -> Result<(String, &str), CompareError> {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut comment_depth = 0usize;
    let mut after_space = false;
    let mut chars = text.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        if let Some(q) = quote {
            if q == '\'' && ch == q && chars.next_if(|&(_, c)| c == '\'').is_some() {
                out.push('\'');
            } else if ch == q {
                quote = None;
                out.push('"');
            } else if ch != '"' {
                out.push(ch);
            }
            continue;
        }
        if comment_depth > 0 {
            match ch {
                '[' => comment_depth += 1,
                ']' => comment_depth -= 1,
                _ => {}
            }
            continue;
        }
        match ch {
            '[' => comment_depth = 1,
            ']' => return Err(CompareError::Parse("unmatched ']'".to_string())),
            '\'' | '"' => {
                quote = Some(ch);
                out.push('"');
            }
            ';' => {
                out.push(';');
                return Ok((out, &text[pos + 1..]));
            }
            c if c.is_whitespace() => {
                after_space = true;
                continue;
            }
            c => {
                if after_space && is_label_char(c) && out.chars().next_back().is_some_and(is_label_char) {
                    let head = out.rsplit(|p: char| !is_label_char(p)).next().unwrap_or_default();
                    return Err(CompareError::Parse(format!(
                        "unquoted whitespace inside label {head:?}; quote labels that contain spaces"
                    )));
                }
                out.push(c);
            }
        }
        after_space = false;
    }

    if quote.is_some() {
        Err(CompareError::Parse("unterminated quoted label".to_string()))
    } else if comment_depth > 0 {
        Err(CompareError::Parse("unterminated comment".to_string()))
    } else {
        Err(CompareError::Parse("missing terminating ';'".to_string()))
    }
}

fn is_label_char(c: char) -> bool {
    !matches!(c, '(' | ')' | ',' | ':' | ';' | '[' | ']' | '\'' | '"')
}

/// Bracket balance and a single top-level clade.
fn validate_structure(clean: &str) -> Result<(), CompareError> {
    if !clean.starts_with('(') {
        return Err(CompareError::Parse(
            "tree must start with '(' (single-leaf trees are not comparable)".to_string(),
        ));
    }

    let mut depth = 0usize;
    let mut closed = false;
    let mut in_quotes = false;
    for ch in clean.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        match ch {
            '(' if closed => {
                return Err(CompareError::Parse("more than one top-level clade".to_string()));
            }
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| CompareError::Parse("unbalanced ')'".to_string()))?;
                closed = depth == 0;
            }
            ',' if depth == 0 => {
                return Err(CompareError::Parse("comma outside of any clade".to_string()));
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(CompareError::Parse("missing closing bracket".to_string()));
    }
    Ok(())
}

fn is_nexus(text: &str) -> bool {
    text.trim_start().to_ascii_uppercase().starts_with("#NEXUS")
}

struct NexusTree {
    newick: String,
    translate: HashMap<String, String>,
}

/// First `TREE name = ...;` statement of a Nexus file plus its `TRANSLATE` table.
fn extract_nexus_tree(content: &str) -> Result<NexusTree, CompareError> {
    let upper = content.to_ascii_uppercase();
    let start = upper
        .split('\n')
        .scan(0usize, |offset, line| {
            let at = *offset;
            *offset += line.len() + 1;
            Some((at, line))
        })
        .find(|(_, line)| {
            let t = line.trim_start();
            t.starts_with("TREE ") || t.starts_with("UTREE ")
        })
        .map(|(at, _)| at)
        .ok_or_else(|| CompareError::Parse("Nexus input has no TREE statement".to_string()))?;

    let statement = strip_comments(&content[start..]);
    let body = statement
        .split_once('=')
        .map(|(_, body)| body.trim_start())
        .ok_or_else(|| CompareError::Parse("Nexus TREE statement has no '='".to_string()))?;

    Ok(NexusTree {
        newick: body.to_string(),
        translate: parse_translate_block(&content[..start]),
    })
}

fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for ch in text.chars() {
        match ch {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            c if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn parse_translate_block(content: &str) -> HashMap<String, String> {
    let upper = content.to_ascii_uppercase();
    let Some(start) = upper.find("TRANSLATE") else {
        return HashMap::new();
    };
    let block = &content[start + "TRANSLATE".len()..];
    let block = block.split(';').next().unwrap_or_default();

    block
        // STRUCTURE:
        // 1 '1959.M.CD.59.ZR59',
        // 2 '1960.DRC60A',
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split_whitespace();
            let id = parts.next()?.to_string();
            let label = parts.next()?.trim_matches('\'').to_string();
            Some((id, label))
        })
        .collect::<HashMap<_, _>>()
}

/// Replace translated leaf ids with their labels; unknown ids are kept.
pub fn rename_leaf_nodes(tree: &mut Tree, translate: &HashMap<String, String>) {
    for leaf_id in tree.get_leaves() {
        if let Ok(node) = tree.get_mut(&leaf_id) {
            let translated = node.name.as_ref().and_then(|n| translate.get(n.trim_matches('"')));
            if let Some(label) = translated {
                node.name = Some(label.clone());
            }
        }
    }
}

/// Write a header and rows as TSV to a file or stdout.
/// If `path` ends with `.gz`, the output is gzip-compressed.
/// If `path` equals `-`, the table is written to stdout (uncompressed).
pub fn write_tsv<P: AsRef<Path>>(path: P, header: &[&str], rows: &[Vec<String>]) -> io::Result<()> {
    use std::fs::File;
    use std::io::BufWriter;

    let p = path.as_ref();
    let is_gz = p.to_string_lossy().ends_with(".gz");

    let mut out: Box<dyn Write> = if p.as_os_str() == "-" {
        Box::new(BufWriter::new(io::stdout().lock()))
    } else if is_gz {
        let f = File::create(p)?;
        let enc = GzEncoder::new(f, Compression::default());
        Box::new(BufWriter::new(enc))
    } else {
        Box::new(BufWriter::new(File::create(p)?))
    };

    writeln!(&mut out, "{}", header.join("\t"))?;
    for row in rows {
        writeln!(&mut out, "{}", row.join("\t"))?;
    }

    out.flush()?;
    Ok(())
}
