//! Pattern compilation

use crate::fragments::{FieldType, fragment};
use crate::grammar::{CompileWarning, GrammarExpression, GrammarKind, ParsingGrammar};
use crate::retention::RetentionDirective;
use crate::tokens::{Segment, tokenize};
use crate::{Error, PatternCompilationError, Result};
use mon_model::{LogFormat, LogSource, ServiceDescriptor};
use regex::Regex;

const FALLBACK_GROK: &str = "%{GREEDYDATA:message}";

/// Compiles log sources into parsing grammars.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogCompiler {
    strict_default: bool,
}

/// Every source's outcome for one descriptor.
#[derive(Debug, Default)]
pub struct CompileReport {
    pub grammars: Vec<ParsingGrammar>,
    pub errors: Vec<Error>,
}

impl CompileReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &CompileWarning> {
        self.grammars.iter().flat_map(|g| &g.warnings)
    }
}

impl LogCompiler {
    /// `strict_default` applies to sources without their own `strict` flag.
    pub fn new(strict_default: bool) -> Self {
        Self { strict_default }
    }

    pub fn compile(&self, source: &LogSource) -> Result<ParsingGrammar> {
        let strict = source.strict.unwrap_or(self.strict_default);
        let retention = source
            .retention()
            .map(|policy| RetentionDirective::parse(&source.name, &policy))
            .transpose()?;

        let mut grammar = ParsingGrammar {
            source_name: source.name.clone(),
            log_type: source.log_type(),
            path: source.path.clone(),
            kind: GrammarKind::Grok,
            expressions: Vec::new(),
            retention,
            warnings: Vec::new(),
            record_start: None,
        };

        if source.format == LogFormat::StructuredJson {
            grammar.kind = GrammarKind::Structured;
            return Ok(grammar);
        }

        let multiline = source.format == LogFormat::Multiline;
        let patterns: Vec<&str> = source.patterns.iter().map(String::as_str).collect();
        for pattern in &patterns {
            let expression = compile_pattern(source, pattern, strict, multiline, &mut grammar.warnings)?;
            grammar.expressions.push(expression);
        }
        if grammar.expressions.is_empty() {
            grammar.expressions.push(fallback_expression(source, multiline)?);
        }

        if multiline {
            let start_pattern = record_start_pattern(patterns.first().copied());
            grammar.record_start = Some(Regex::new(&start_pattern).map_err(|e| Error::Expression {
                source_name: source.name.clone(),
                message: e.to_string(),
            })?);
            grammar.kind = GrammarKind::Multiline { start_pattern };
        }

        for warning in &grammar.warnings {
            tracing::warn!("{}", warning);
        }
        tracing::debug!(
            source = %source.name,
            format = %source.format,
            expressions = grammar.expressions.len(),
            "compiled log grammar"
        );
        Ok(grammar)
    }

    /// Compile every log source, collecting errors instead of stopping at
    /// the first.
    pub fn compile_all(&self, descriptor: &ServiceDescriptor) -> CompileReport {
        let mut report = CompileReport::default();
        for source in &descriptor.logs {
            match self.compile(source) {
                Ok(grammar) => report.grammars.push(grammar),
                Err(error) => {
                    tracing::error!("{}", error);
                    report.errors.push(error);
                }
            }
        }
        report
    }
}

fn compile_pattern(
    source: &LogSource,
    pattern: &str,
    strict: bool,
    multiline: bool,
    warnings: &mut Vec<CompileWarning>,
) -> Result<GrammarExpression> {
    let mut grok = String::new();
    let mut regex = String::from(if multiline { "(?s)^" } else { "^" });
    let mut fields: Vec<(String, FieldType)> = Vec::new();

    for segment in tokenize(pattern) {
        match segment {
            Segment::Literal(text) => {
                let escaped = regex::escape(&text);
                grok.push_str(&escaped);
                regex.push_str(&escaped);
            }
            Segment::Token(token) => match fragment(&token) {
                Some(f) => {
                    grok.push_str(f.grok);
                    if fields.iter().any(|(name, _)| name == f.field) {
                        regex.push_str(&format!("(?:{})", f.regex));
                    } else {
                        regex.push_str(&format!("(?P<{}>{})", f.field, f.regex));
                        fields.push((f.field.to_string(), f.field_type));
                    }
                }
                None if strict => {
                    return Err(PatternCompilationError {
                        source_name: source.name.clone(),
                        token,
                        pattern: pattern.to_string(),
                    }
                    .into());
                }
                None => {
                    let escaped = regex::escape(&token);
                    grok.push_str(&escaped);
                    regex.push_str(&escaped);
                    warnings.push(CompileWarning {
                        source_name: source.name.clone(),
                        token,
                        pattern: pattern.to_string(),
                    });
                }
            },
        }
    }
    regex.push('$');
    if multiline {
        grok.insert_str(0, "(?m)");
    }
    build_expression(source, pattern, grok, regex, fields)
}

fn fallback_expression(source: &LogSource, multiline: bool) -> Result<GrammarExpression> {
    let (grok, regex) = if multiline {
        (format!("(?m){}", FALLBACK_GROK), "(?s)^(?P<message>.*)$".to_string())
    } else {
        (FALLBACK_GROK.to_string(), "^(?P<message>.*)$".to_string())
    };
    build_expression(
        source,
        "MESSAGE",
        grok,
        regex,
        vec![("message".to_string(), FieldType::Text)],
    )
}

fn build_expression(
    source: &LogSource,
    pattern: &str,
    grok: String,
    regex: String,
    fields: Vec<(String, FieldType)>,
) -> Result<GrammarExpression> {
    let compiled = Regex::new(&regex).map_err(|e| Error::Expression {
        source_name: source.name.clone(),
        message: e.to_string(),
    })?;
    Ok(GrammarExpression {
        pattern: pattern.to_string(),
        grok,
        regex,
        fields,
        compiled,
    })
}

/// Record-start expression from the first element of the first pattern.
/// Uses only syntax shared by the collector's regex dialect.
fn record_start_pattern(first_pattern: Option<&str>) -> String {
    let first = first_pattern.and_then(|p| tokenize(p.trim_start()).into_iter().next());
    match first {
        Some(Segment::Token(token)) => match fragment(&token) {
            Some(f) if f.token != "MESSAGE" => format!("^(?:{})", f.regex),
            Some(_) => r"^\S".to_string(),
            None => format!("^{}", regex::escape(&token)),
        },
        Some(Segment::Literal(text)) => match text.chars().next() {
            Some(c) => format!("^{}", regex::escape(&c.to_string())),
            None => r"^\S".to_string(),
        },
        None => r"^\S".to_string(),
    }
}
