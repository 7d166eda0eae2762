//! 패턴 컴파일러 -- 룰 템플릿을 정규식 매처로 변환합니다.
//!
//! 템플릿은 리터럴 텍스트와 위치 플레이스홀더(`{n}`, `{n:specifier}`)로 구성됩니다.
//! 리터럴은 이스케이프되고, 전체는 `[\s\S]*...[\s\S]*`로 감싸져
//! 여러 줄짜리 레코드 어디에서든 매칭됩니다.
//!
//! # 플레이스홀더 변환
//!
//! | 형태 | 정규식 |
//! |------|--------|
//! | `{n:uptoHyphen}` | `([^\-]+)(?:-[^,]+)?` |
//! | 템플릿 끝의 `{n}` | `(.+)` |
//! | 그 외 `{n}` | `(.+?)` |
//!
//! 컴파일 결과는 템플릿 문자열 단위로 캐싱됩니다.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::error::LogPipelineError;

/// 하이픈 앞까지만 캡처하는 지정자
pub const SPECIFIER_UPTO_HYPHEN: &str = "uptoHyphen";

/// 허용되는 가장 큰 플레이스홀더 인덱스
pub const MAX_PLACEHOLDER_INDEX: usize = 64;

const ANY_TEXT: &str = r"[\s\S]*";

/// 컴파일된 패턴
#[derive(Debug)]
pub struct CompiledPattern {
    /// 원본 템플릿
    template: String,
    /// 컴파일된 정규식
    regex: Regex,
    /// 플레이스홀더 인덱스 -> 정규식 캡처 그룹 번호
    groups_by_index: Vec<Option<usize>>,
}

impl CompiledPattern {
    /// 템플릿을 컴파일합니다.
    ///
    /// # Errors
    /// - 빈 템플릿
    /// - 알 수 없는 지정자
    /// - 정규식 컴파일 실패
    pub fn compile(template: &str) -> Result<Self, LogPipelineError> {
        if template.is_empty() {
            return Err(pattern_error(template, "template must not be empty"));
        }

        let mut source = String::from(ANY_TEXT);
        let mut groups_by_index: Vec<Option<usize>> = Vec::new();
        let mut group = 0usize;
        let mut literal_start = 0usize;
        let mut pos = 0usize;

        while let Some(offset) = template[pos..].find('{') {
            let open = pos + offset;
            let Some(placeholder) = Placeholder::parse(template, open)? else {
                pos = open + 1;
                continue;
            };

            source.push_str(&regex::escape(&template[literal_start..open]));

            let at_end = placeholder.end == template.len();
            match placeholder.specifier {
                Some(SPECIFIER_UPTO_HYPHEN) => source.push_str(r"([^\-]+)(?:-[^,]+)?"),
                Some(other) => {
                    return Err(pattern_error(
                        template,
                        format!("unknown specifier '{other}'"),
                    ));
                }
                None if at_end => source.push_str("(.+)"),
                None => source.push_str("(.+?)"),
            }
            group += 1;

            if groups_by_index.len() <= placeholder.index {
                groups_by_index.resize(placeholder.index + 1, None);
            }
            if groups_by_index[placeholder.index].is_none() {
                groups_by_index[placeholder.index] = Some(group);
            }

            literal_start = placeholder.end;
            pos = placeholder.end;
        }

        source.push_str(&regex::escape(&template[literal_start..]));
        source.push_str(ANY_TEXT);

        let regex = Regex::new(&source)
            .map_err(|e| pattern_error(template, format!("regex compile failed: {e}")))?;

        Ok(Self {
            template: template.to_owned(),
            regex,
            groups_by_index,
        })
    }

    /// 원본 템플릿
    pub fn template(&self) -> &str {
        &self.template
    }

    /// 생성된 정규식 소스
    pub fn as_regex_str(&self) -> &str {
        self.regex.as_str()
    }

    /// 플레이스홀더 개수 (가장 큰 인덱스 + 1)
    pub fn placeholder_count(&self) -> usize {
        self.groups_by_index.len()
    }

    /// 텍스트가 패턴에 매칭되는지 확인합니다.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// 매칭되면 캡처 목록을 반환합니다.
    ///
    /// `[0]`은 전체 매칭, `[n + 1]`은 플레이스홀더 `{n}`의 값입니다.
    /// 템플릿에 없는 인덱스는 빈 문자열로 채워집니다.
    pub fn captures(&self, text: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(text)?;
        let mut out = Vec::with_capacity(self.groups_by_index.len() + 1);
        out.push(caps.get(0).map_or_else(String::new, |m| m.as_str().to_owned()));
        for group in &self.groups_by_index {
            let value = group
                .and_then(|g| caps.get(g))
                .map_or_else(String::new, |m| m.as_str().to_owned());
            out.push(value);
        }
        Some(out)
    }
}

/// 템플릿 안의 플레이스홀더 하나
struct Placeholder<'a> {
    index: usize,
    specifier: Option<&'a str>,
    /// 닫는 `}` 다음 위치
    end: usize,
}

impl<'a> Placeholder<'a> {
    /// `open` 위치의 `{`에서 플레이스홀더를 읽습니다.
    ///
    /// 형식이 맞지 않으면 `None` (리터럴 `{`로 취급).
    fn parse(template: &'a str, open: usize) -> Result<Option<Self>, LogPipelineError> {
        let bytes = template.as_bytes();
        let mut cursor = open + 1;

        let digits_start = cursor;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        if cursor == digits_start {
            return Ok(None);
        }
        let digits = &template[digits_start..cursor];

        let mut specifier = None;
        if cursor < bytes.len() && bytes[cursor] == b':' {
            let spec_start = cursor + 1;
            cursor = spec_start;
            while cursor < bytes.len()
                && (bytes[cursor].is_ascii_alphanumeric() || bytes[cursor] == b'_')
            {
                cursor += 1;
            }
            if cursor == spec_start {
                return Ok(None);
            }
            specifier = Some(&template[spec_start..cursor]);
        }

        if cursor >= bytes.len() || bytes[cursor] != b'}' {
            return Ok(None);
        }

        let index = digits.parse::<usize>().map_err(|_| {
            pattern_error(template, format!("placeholder index '{digits}' is too large"))
        })?;
        if index > MAX_PLACEHOLDER_INDEX {
            return Err(pattern_error(
                template,
                format!("placeholder index {index} exceeds {MAX_PLACEHOLDER_INDEX}"),
            ));
        }

        Ok(Some(Self {
            index,
            specifier,
            end: cursor + 1,
        }))
    }
}

fn pattern_error(template: &str, reason: impl Into<String>) -> LogPipelineError {
    LogPipelineError::Pattern {
        template: template.to_owned(),
        reason: reason.into(),
    }
}

/// 템플릿 단위로 컴파일 결과를 캐싱하는 컴파일러
#[derive(Debug, Default)]
pub struct PatternCompiler {
    cache: HashMap<String, Arc<CompiledPattern>>,
}

impl PatternCompiler {
    /// 새 컴파일러를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 템플릿을 컴파일합니다. 같은 템플릿은 한 번만 컴파일됩니다.
    pub fn compile(&mut self, template: &str) -> Result<Arc<CompiledPattern>, LogPipelineError> {
        if let Some(compiled) = self.cache.get(template) {
            return Ok(Arc::clone(compiled));
        }
        let compiled = Arc::new(CompiledPattern::compile(template)?);
        self.cache
            .insert(template.to_owned(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// 캐시된 템플릿 수
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upto_hyphen_example() {
        let pattern = CompiledPattern::compile("id={0:uptoHyphen}, state={1}").unwrap();
        let caps = pattern
            .captures("We got a new id=o9OKUJa-123456, state=active")
            .unwrap();
        assert_eq!(&caps[1..], ["o9OKUJa", "active"]);
    }

    #[test]
    fn upto_hyphen_without_suffix() {
        let pattern = CompiledPattern::compile("offer {0:uptoHyphen}, done").unwrap();
        let caps = pattern.captures("offer abc, done").unwrap();
        assert_eq!(caps[1], "abc");
    }

    #[test]
    fn literal_only_template_matches_anywhere() {
        let pattern = CompiledPattern::compile("End of sync detected").unwrap();
        let text = "Sep-05 13:54:39.480 [main] INFO  b.c.Foo: prefix\nEnd of sync detected\nsuffix";
        assert!(pattern.is_match(text));
        let caps = pattern.captures(text).unwrap();
        assert_eq!(caps.len(), 1);
        assert_eq!(caps[0], text);
    }

    #[test]
    fn literal_special_characters_are_escaped() {
        let pattern = CompiledPattern::compile("price (BTC) = {0} [ok]").unwrap();
        assert!(pattern.captures("price (BTC) = 0.01 [ok]").is_some());
        assert!(pattern.captures("price BTC = 0.01 ok").is_none());
    }

    #[test]
    fn middle_placeholder_is_lazy_and_last_is_greedy() {
        let pattern = CompiledPattern::compile("from {0} to {1}").unwrap();
        let caps = pattern.captures("from a to b to c").unwrap();
        assert_eq!(caps[1], "a");
        assert_eq!(caps[2], "b to c");
    }

    #[test]
    fn placeholders_do_not_cross_lines() {
        let pattern = CompiledPattern::compile("trade {0} completed").unwrap();
        assert!(pattern.captures("trade abc\n completed").is_none());
        let caps = pattern.captures("header\ntrade abc completed\nstack").unwrap();
        assert_eq!(caps[1], "abc");
    }

    #[test]
    fn captures_are_ordered_by_index() {
        let pattern = CompiledPattern::compile("coin {1} sent to {0}.").unwrap();
        let caps = pattern.captures("coin BTC sent to alice.").unwrap();
        assert_eq!(caps[1], "alice");
        assert_eq!(caps[2], "BTC");
    }

    #[test]
    fn repeated_index_uses_first_occurrence() {
        let pattern = CompiledPattern::compile("{0} and {0} again").unwrap();
        let caps = pattern.captures("x and y again").unwrap();
        assert_eq!(caps.len(), 2);
        assert_eq!(caps[1], "x");
    }

    #[test]
    fn index_gaps_are_filled_with_empty_strings() {
        let pattern = CompiledPattern::compile("value {1}").unwrap();
        let caps = pattern.captures("value 7").unwrap();
        assert_eq!(caps, vec!["value 7".to_owned(), String::new(), "7".to_owned()]);
    }

    #[test]
    fn unknown_specifier_is_an_error() {
        let err = CompiledPattern::compile("id={0:uptoComma}").unwrap_err();
        assert!(matches!(err, LogPipelineError::Pattern { .. }));
        assert!(err.to_string().contains("uptoComma"));
    }

    #[test]
    fn empty_template_is_an_error() {
        assert!(CompiledPattern::compile("").is_err());
    }

    #[test]
    fn malformed_braces_are_literal() {
        let pattern = CompiledPattern::compile("json {\"a\": {x}} {0}").unwrap();
        let caps = pattern.captures("json {\"a\": {x}} done").unwrap();
        assert_eq!(caps[1], "done");
    }

    #[test]
    fn huge_index_is_an_error() {
        let err = CompiledPattern::compile("{99999999999999999999999}").unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn index_above_limit_is_an_error() {
        let err = CompiledPattern::compile("trade {9000000000} started").unwrap_err();
        assert!(matches!(err, LogPipelineError::Pattern { .. }));
        assert!(err.to_string().contains("exceeds"));

        let pattern = CompiledPattern::compile("trade {64} started").unwrap();
        assert_eq!(pattern.placeholder_count(), MAX_PLACEHOLDER_INDEX + 1);
    }

    #[test]
    fn compiler_caches_per_template() {
        let mut compiler = PatternCompiler::new();
        let a = compiler.compile("state={0}").unwrap();
        let b = compiler.compile("state={0}").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        compiler.compile("other={0}").unwrap();
        assert_eq!(compiler.cached_count(), 2);
    }

    #[test]
    fn compiler_does_not_cache_failures() {
        let mut compiler = PatternCompiler::new();
        assert!(compiler.compile("{0:bogus}").is_err());
        assert_eq!(compiler.cached_count(), 0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn compile_never_panics(template in ".{0,64}") {
                let _ = CompiledPattern::compile(&template);
            }

            #[test]
            fn literal_template_matches_when_embedded(
                literal in "[a-zA-Z0-9 .,:()\\[\\]*+?|^$]{1,32}",
                prefix in "[a-z \n]{0,16}",
                suffix in "[a-z \n]{0,16}",
            ) {
                let pattern = CompiledPattern::compile(&literal).unwrap();
                let text = format!("{prefix}{literal}{suffix}");
                prop_assert!(pattern.is_match(&text));
            }

            #[test]
            fn trailing_placeholder_captures_rest_of_line(
                value in "[a-zA-Z0-9_.-]{1,24}",
            ) {
                let pattern = CompiledPattern::compile("state={0}").unwrap();
                let caps = pattern.captures(&format!("new state={value}\nnext line")).unwrap();
                prop_assert_eq!(&caps[1], &value);
            }
        }
    }
}
