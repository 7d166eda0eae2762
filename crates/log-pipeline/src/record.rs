//! 레코드 파서 -- Bisq 로그 헤더 인식과 멀티라인 레코드 조립
//!
//! Bisq(logback) 로그의 한 레코드는 헤더 줄로 시작하고, 헤더가 없는 줄
//! (스택 트레이스 등)은 직전 레코드의 연속 줄입니다.
//!
//! # 헤더 형식
//! ```text
//! Sep-05 13:54:39.480 [JavaFX Application Thread] INFO  b.c.o.OfferBookService: ...
//! <Mon>-<day> <HH:MM:SS.mmm> [<thread>] <LEVEL> <pad> <logger>: <rest>
//! ```
//!
//! 헤더에는 연도가 없으므로 현재 연도를 붙이고, 결과가 미래라면 한 해를 뺍니다.

use chrono::{DateTime, Datelike, Local, NaiveDateTime, TimeZone};
use regex::Regex;

use bisq_watcher_core::types::Severity;

use crate::error::LogPipelineError;

const HEADER_PATTERN: &str = r"^(\w+-\d+ \d+:\d+:\d+\.\d+) \[(.*?)\] (\w+) +(.*?):";

/// 헤더 줄에서 추출한 메타데이터
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    /// 레코드 시각 (로컬 타임존)
    pub timestamp: DateTime<Local>,
    /// 레벨 토큰에서 변환한 심각도
    pub severity: Severity,
    /// 스레드 이름
    pub thread: String,
    /// 로거 이름
    pub logger: String,
}

/// 헤더 줄 파서
#[derive(Debug, Clone)]
pub struct HeaderParser {
    regex: Regex,
}

impl HeaderParser {
    /// 새 파서를 생성합니다.
    pub fn new() -> Result<Self, LogPipelineError> {
        Ok(Self {
            regex: Regex::new(HEADER_PATTERN)?,
        })
    }

    /// 줄이 헤더이면 메타데이터를 반환합니다.
    pub fn parse(&self, line: &str) -> Option<RecordHeader> {
        self.parse_at(line, Local::now())
    }

    /// `now`를 기준으로 연도를 추론하여 헤더를 파싱합니다.
    ///
    /// 헤더 형식은 맞지만 날짜가 유효하지 않으면 `now`를 시각으로 씁니다.
    pub fn parse_at(&self, line: &str, now: DateTime<Local>) -> Option<RecordHeader> {
        let caps = self.regex.captures(line)?;
        let stamp = caps.get(1)?.as_str();

        let timestamp = infer_timestamp(stamp, now).unwrap_or_else(|| {
            tracing::debug!(stamp, "unparseable header timestamp, using current time");
            now
        });

        Some(RecordHeader {
            timestamp,
            severity: Severity::from_log_level(caps.get(3)?.as_str()),
            thread: caps.get(2)?.as_str().to_owned(),
            logger: caps.get(4)?.as_str().to_owned(),
        })
    }
}

/// `Sep-05 13:54:39.480` 형식의 시각에 연도를 붙입니다.
///
/// 현재 연도로 만든 시각이 `now`보다 미래이면 전년도를 사용합니다.
pub fn infer_timestamp(stamp: &str, now: DateTime<Local>) -> Option<DateTime<Local>> {
    let year = now.year();
    let this_year = with_year(stamp, year);
    match this_year {
        Some(ts) if ts <= now => Some(ts),
        _ => with_year(stamp, year - 1).or(this_year),
    }
}

fn with_year(stamp: &str, year: i32) -> Option<DateTime<Local>> {
    let naive =
        NaiveDateTime::parse_from_str(&format!("{year} {stamp}"), "%Y %b-%d %H:%M:%S%.f").ok()?;
    Local.from_local_datetime(&naive).earliest()
}

/// 헤더 줄과 그 연속 줄로 이루어진 하나의 논리 레코드
#[derive(Debug, Clone)]
pub struct LogRecord {
    text: String,
    header: RecordHeader,
}

impl LogRecord {
    /// 헤더 줄로 새 레코드를 엽니다.
    pub fn open(first_line: impl Into<String>, header: RecordHeader) -> Self {
        Self {
            text: first_line.into(),
            header,
        }
    }

    /// 연속 줄을 덧붙입니다.
    pub fn append(&mut self, line: &str) {
        self.text.push('\n');
        self.text.push_str(line);
    }

    /// 레코드 원문 (줄 사이는 `\n`)
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 헤더 메타데이터
    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    /// 줄 수
    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn fixed_now() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 9, 10, 12, 0, 0)
            .earliest()
            .unwrap()
    }

    #[test]
    fn parses_standard_header() {
        let parser = HeaderParser::new().unwrap();
        let line = "Sep-05 13:54:39.480 [JavaFX Application Thread] INFO  b.c.o.OfferBookService: offer added";
        let header = parser.parse_at(line, fixed_now()).unwrap();

        assert_eq!(header.severity, Severity::Info);
        assert_eq!(header.thread, "JavaFX Application Thread");
        assert_eq!(header.logger, "b.c.o.OfferBookService");
        assert_eq!(header.timestamp.year(), 2024);
        assert_eq!(header.timestamp.month(), 9);
        assert_eq!(header.timestamp.day(), 5);
        assert_eq!(header.timestamp.hour(), 13);
        assert_eq!(header.timestamp.nanosecond(), 480_000_000);
    }

    #[test]
    fn accepts_single_space_after_level() {
        let parser = HeaderParser::new().unwrap();
        let line = "Sep-05 13:54:39.480 [main] ERROR b.c.Foo: boom";
        let header = parser.parse_at(line, fixed_now()).unwrap();
        assert_eq!(header.severity, Severity::Error);
        assert_eq!(header.logger, "b.c.Foo");
    }

    #[test]
    fn maps_warn_and_unknown_levels() {
        let parser = HeaderParser::new().unwrap();
        let warn = parser
            .parse_at("Jan-02 01:02:03.004 [t] WARN  a.B: x", fixed_now())
            .unwrap();
        assert_eq!(warn.severity, Severity::Warning);
        let trace = parser
            .parse_at("Jan-02 01:02:03.004 [t] TRACE a.B: x", fixed_now())
            .unwrap();
        assert_eq!(trace.severity, Severity::Unknown);
    }

    #[test]
    fn continuation_lines_are_not_headers() {
        let parser = HeaderParser::new().unwrap();
        assert!(parser.parse("\tat bisq.core.Foo.bar(Foo.java:42)").is_none());
        assert!(parser.parse("java.lang.NullPointerException: null").is_none());
        assert!(parser.parse("").is_none());
    }

    #[test]
    fn future_date_rolls_back_one_year() {
        let ts = infer_timestamp("Dec-31 23:59:59.999", fixed_now()).unwrap();
        assert_eq!(ts.year(), 2023);
        let ts = infer_timestamp("Sep-10 11:59:59.000", fixed_now()).unwrap();
        assert_eq!(ts.year(), 2024);
    }

    #[test]
    fn invalid_date_falls_back_to_now() {
        let parser = HeaderParser::new().unwrap();
        let now = fixed_now();
        let header = parser
            .parse_at("Foo-99 13:54:39.480 [main] INFO  a.B: x", now)
            .unwrap();
        assert_eq!(header.timestamp, now);
    }

    #[test]
    fn record_reassembles_lines() {
        let parser = HeaderParser::new().unwrap();
        let first = "Sep-05 13:54:39.480 [main] ERROR b.c.Foo: failed";
        let header = parser.parse_at(first, fixed_now()).unwrap();
        let mut record = LogRecord::open(first, header);
        record.append("java.lang.IllegalStateException: bad");
        record.append("\tat b.c.Foo.run(Foo.java:1)");

        assert_eq!(record.line_count(), 3);
        assert_eq!(
            record.text(),
            "Sep-05 13:54:39.480 [main] ERROR b.c.Foo: failed\njava.lang.IllegalStateException: bad\n\tat b.c.Foo.run(Foo.java:1)"
        );
        assert_eq!(record.header().logger, "b.c.Foo");
    }
}
