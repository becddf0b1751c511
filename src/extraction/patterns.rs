//! Pattern-based grammars for the built-in languages.
//!
//! Each language contributes a set of definition patterns (capture group 1
//! is the identifier) plus a keyword list used to filter false positives.
//! Reference tags come from a shared call-site pattern: any identifier
//! immediately followed by an opening paren that is not itself a
//! definition header.
//!
//! Patterns are cached as statics to avoid recompilation on every parse.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{Tag, TagKind};

use super::grammar::Grammar;

/// Identifier followed by `(`. Matches both call sites and definition
/// headers; definition capture positions are subtracted before emitting.
static CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("invalid call regex"));

/// A grammar driven entirely by static regex tables.
pub(super) struct PatternGrammar {
    name: &'static str,
    defs: &'static [&'static Lazy<Regex>],
    keywords: &'static [&'static str],
}

impl Grammar for PatternGrammar {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract(&self, path: &Arc<str>, content: &str) -> Vec<Tag> {
        let lines = LineIndex::new(content);

        // Definition hits, keyed by the byte offset of the identifier so
        // overlapping patterns collapse to one tag.
        let mut def_hits: std::collections::BTreeMap<usize, &str> = Default::default();
        for pattern in self.defs {
            for cap in pattern.captures_iter(content) {
                let m = cap.get(1).expect("def pattern without capture group");
                if self.is_keyword(m.as_str()) {
                    continue;
                }
                def_hits.entry(m.start()).or_insert(m.as_str());
            }
        }

        // A definition spans from its header to the line before the next
        // definition header, or to the end of the file. Approximate, but
        // stable, and enough to anchor elision blocks.
        let def_lines: Vec<u32> = def_hits
            .keys()
            .map(|&offset| lines.line_of(offset))
            .collect();
        let last_line = lines.last_line();

        let mut hits: Vec<(usize, &str, TagKind)> = def_hits
            .iter()
            .map(|(&offset, &name)| (offset, name, TagKind::Def))
            .collect();

        for cap in CALL.captures_iter(content) {
            let m = cap.get(1).expect("call capture");
            if def_hits.contains_key(&m.start()) || self.is_keyword(m.as_str()) {
                continue;
            }
            hits.push((m.start(), m.as_str(), TagKind::Ref));
        }

        hits.sort_by_key(|&(offset, _, kind)| (offset, kind == TagKind::Ref));

        hits.into_iter()
            .map(|(offset, name, kind)| {
                let start = lines.line_of(offset);
                let end = match kind {
                    TagKind::Def => {
                        let next = def_lines.partition_point(|&l| l <= start);
                        def_lines
                            .get(next)
                            .map(|&l| (l - 1).max(start))
                            .unwrap_or(last_line)
                    }
                    TagKind::Ref => start,
                };
                Tag {
                    path: path.clone(),
                    name: Arc::from(name),
                    kind,
                    start_line: start,
                    end_line: end,
                }
            })
            .collect()
    }
}

impl PatternGrammar {
    fn is_keyword(&self, ident: &str) -> bool {
        self.keywords.contains(&ident)
    }
}

/// Byte offset to 1-indexed line lookup, built once per file.
struct LineIndex {
    starts: Vec<usize>,
    last_line: u32,
}

impl LineIndex {
    fn new(content: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(content.match_indices('\n').map(|(i, _)| i + 1));
        let last_line = if content.ends_with('\n') {
            starts.len().saturating_sub(1).max(1) as u32
        } else {
            starts.len() as u32
        };
        Self { starts, last_line }
    }

    fn line_of(&self, offset: usize) -> u32 {
        self.starts.partition_point(|&s| s <= offset) as u32
    }

    fn last_line(&self) -> u32 {
        self.last_line
    }
}

// ============================================================================
// PYTHON
// ============================================================================

mod python {
    use super::*;

    /// `class Foo:` or `class Foo(Bar):`
    pub static CLASS: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?m)^\s*class\s+(\w+)").expect("invalid python class regex"));

    /// `def foo(` at any indentation, including `async def`
    pub static FUNCTION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^\s*(?:async\s+)?def\s+(\w+)\s*\(").expect("invalid python def regex")
    });

    /// Module-level constants: `FOO = ...`
    pub static CONSTANT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^([A-Z_][A-Z0-9_]*)\s*=").expect("invalid python constant regex")
    });
}

pub(super) static PYTHON: PatternGrammar = PatternGrammar {
    name: "python",
    defs: &[&python::CLASS, &python::FUNCTION, &python::CONSTANT],
    keywords: &[
        "if", "elif", "else", "while", "for", "with", "def", "class", "return", "yield",
        "lambda", "not", "and", "or", "in", "is", "assert", "raise", "except", "import",
        "from", "pass", "del", "global", "nonlocal", "try", "finally", "await", "async",
    ],
};

// ============================================================================
// RUST
// ============================================================================

mod rust {
    use super::*;

    /// `fn foo(` with optional pub/async/const/unsafe modifiers
    pub static FUNCTION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+(\w+)")
            .expect("invalid rust fn regex")
    });

    /// `struct Foo`, `enum Foo`, `trait Foo`, `union Foo`
    pub static TYPE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?(?:struct|enum|trait|union)\s+(\w+)")
            .expect("invalid rust type regex")
    });

    /// `type Foo =`
    pub static ALIAS: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?type\s+(\w+)").expect("invalid rust alias regex")
    });

    /// `const FOO:` or `static BAR:`
    pub static CONSTANT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const|static)\s+(\w+)\s*:")
            .expect("invalid rust const regex")
    });
}

pub(super) static RUST: PatternGrammar = PatternGrammar {
    name: "rust",
    defs: &[&rust::FUNCTION, &rust::TYPE, &rust::ALIAS, &rust::CONSTANT],
    keywords: &[
        "if", "else", "while", "for", "loop", "match", "return", "fn", "let", "mut",
        "impl", "where", "move", "ref", "as", "in", "use", "mod", "pub", "unsafe",
        "Some", "None", "Ok", "Err", "Box", "Vec", "self", "Self",
    ],
};

// ============================================================================
// JAVASCRIPT / TYPESCRIPT
// ============================================================================

mod js {
    use super::*;

    /// `function foo(` or `async function foo(`
    pub static FUNCTION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s+(\w+)\s*\(")
            .expect("invalid js function regex")
    });

    /// `class Foo` or `export class Foo`
    pub static CLASS: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+(\w+)")
            .expect("invalid js class regex")
    });

    /// `const foo = (` / `const foo = async (` arrow assignments
    pub static CONST_ARROW: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^\s*(?:export\s+)?(?:const|let|var)\s+(\w+)\s*=\s*(?:async\s*)?\(")
            .expect("invalid js arrow regex")
    });

    /// Class methods: indented `name(args) {`
    pub static METHOD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^\s+(?:async\s+)?(\w+)\s*\([^)\n]*\)\s*\{").expect("invalid js method regex")
    });
}

mod ts {
    use super::*;

    /// `interface Foo` or `export interface Foo`
    pub static INTERFACE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^\s*(?:export\s+)?interface\s+(\w+)").expect("invalid ts interface regex")
    });

    /// `type Foo =` or `export type Foo =`
    pub static ALIAS: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^\s*(?:export\s+)?type\s+(\w+)\s*=").expect("invalid ts type regex")
    });

    /// `enum Color` or `export enum Color`
    pub static ENUM: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^\s*(?:export\s+)?(?:const\s+)?enum\s+(\w+)").expect("invalid ts enum regex")
    });
}

const JS_KEYWORDS: &[&str] = &[
    "if", "else", "while", "for", "switch", "catch", "return", "function", "typeof",
    "new", "await", "async", "constructor", "super", "this", "throw", "delete", "in",
    "of", "instanceof", "do", "yield",
];

pub(super) static JAVASCRIPT: PatternGrammar = PatternGrammar {
    name: "javascript",
    defs: &[&js::FUNCTION, &js::CLASS, &js::CONST_ARROW, &js::METHOD],
    keywords: JS_KEYWORDS,
};

pub(super) static TYPESCRIPT: PatternGrammar = PatternGrammar {
    name: "typescript",
    defs: &[
        &js::FUNCTION,
        &js::CLASS,
        &js::CONST_ARROW,
        &js::METHOD,
        &ts::INTERFACE,
        &ts::ALIAS,
        &ts::ENUM,
    ],
    keywords: JS_KEYWORDS,
};

// ============================================================================
// GO
// ============================================================================

mod go {
    use super::*;

    /// `func Foo(` or method `func (r *Recv) Foo(`
    pub static FUNCTION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^func\s+(?:\([^)]*\)\s+)?(\w+)\s*\(").expect("invalid go func regex")
    });

    /// `type Foo struct` / `type Foo interface` / plain `type Foo`
    pub static TYPE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?m)^type\s+(\w+)").expect("invalid go type regex"));

    /// Top-level `var Foo` and `const Foo`
    pub static VALUE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^(?:var|const)\s+(\w+)").expect("invalid go value regex")
    });
}

pub(super) static GO: PatternGrammar = PatternGrammar {
    name: "go",
    defs: &[&go::FUNCTION, &go::TYPE, &go::VALUE],
    keywords: &[
        "if", "else", "for", "switch", "select", "return", "func", "go", "defer",
        "range", "map", "chan", "make", "new", "len", "cap", "append", "panic",
        "recover", "string", "int", "int64", "bool", "byte", "error",
    ],
};
