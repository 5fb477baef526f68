use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeSitterError {
    #[error("failed to initialize tree-sitter parser")]
    ParserInit,

    #[error("failed to set language for parser")]
    LanguageSet,

    #[error("failed to parse source code")]
    ParseFailed,

    #[error("syntax error at line {line}, column {column} (byte {byte_start}..{byte_end})")]
    SyntaxError {
        line: usize,
        column: usize,
        byte_start: usize,
        byte_end: usize,
    },

    #[error("{count} syntax errors detected, first at line {line}")]
    MultipleSyntaxErrors { count: usize, line: usize },

    #[error("replacement source contains no declaration")]
    EmptyReplacement,

    #[error("replacement must start with a function or class definition, found `{kind}`")]
    NotADeclaration { kind: String },
}
