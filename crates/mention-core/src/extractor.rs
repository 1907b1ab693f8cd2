//! 티커 후보 추출기.
//!
//! 본문에서 2~7자의 대문자 토큰(선택적으로 `$` 접두사)을 찾아 티커 후보로
//! 반환합니다. 순수 함수이며 I/O가 없습니다.
//!
//! # 규칙
//!
//! - 패턴: `\$?\b([A-Z]{2,7})\b` (`$`는 결과에 포함되지 않음)
//! - 첫 등장 순서 유지, 중복 제거
//! - [`DenyList`]에 포함된 일반 단어/약어/거래소 코드는 제외

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;

use crate::PipelineError;

/// 기본 제외 목록 버전.
pub const CANONICAL_DENY_LIST_VERSION: &str = "2024.1";

/// 기본 제외 목록 (일반 영어 단어, 커뮤니티 은어, 약어, 거래소/통화 코드).
const CANONICAL_DENY_LIST: &[&str] = &[
    "YMMV", "EPS", "TAKE", "MAY", "YOUVE", "ONLY", "LOST", "MONEY", "IF", "YOU",
    "SELL", "YOUR", "USA", "AUS", "UK", "STOCK", "DUE", "FOMO", "SOB", "NO",
    "ETF", "POS", "PENNY", "GTFOH", "NOT", "TOTAL", "DD", "YOLO", "WSB", "RH",
    "FOR", "THE", "MOON", "BUY", "HOLD", "OP", "GATE", "KEEP", "EV", "TRYING",
    "TWICE", "EVERY", "YET", "MOOOON", "THREE", "MEDUSA", "ANNUAL", "MOVERS",
    "VOLUME", "MONDAY", "TUESDAY", "WEDNESDAY", "THURSDAY", "FRIDAY", "ALASKA",
    "FIRE", "IMHO", "PTSD", "HUGE", "GENIUS", "SCAN", "BAG", "TICKER", "THIS",
    "WEEK", "LETS", "GOOOO", "NASA", "STILL", "OKAY", "RIGHT", "LEMME", "THICC",
    "BEFORE", "GLOBE", "EBITDA", "LMAO", "FAFO", "GET", "LEFT", "BEHIND", "CLASS",
    "VERY", "ADVENT", "HEALTH", "BOYS", "WHICH", "ONE", "JONES", "SODA", "OTC",
    "AND", "RSS", "MARKET", "OF", "SAME", "SUPER", "TOXIC", "ALSO", "NEOW",
    "NASDAQ", "EUR", "USD", "US", "NVIDIA", "IIRC", "ALONE", "WHAT", "SAID",
    "ABOVE", "ADVICE", "DYOR", "ALWAYS", "FOOD", "NYSE", "ISA", "SPX", "BUT",
    "MAYBE", "CALLS", "DRILL", "BABY", "TRUMP", "SHIB", "WILL", "RIP", "EXCEPT",
    "CRYPTO", "DOE", "MIT", "RSI", "DONT", "ENTIRE", "AI", "XYZ", "IS", "LOOK",
    "AT", "IN", "AH", "TODAY", "TIKTOK", "TSA", "CEO", "FDA", "PDUFA", "CTRL",
    "SWOT", "BS", "REAL", "BRUH", "CANADA", "LONG", "LOL", "WAY", "WTF", "PUMP",
    "DUMP", "NEW", "FLAGS", "BOUGHT", "PEAK", "HOLDER", "EOY", "EOW", "IPO",
    "URANUS", "LIGMA", "HELOC", "FY", "LUL", "IT", "PT", "DC", "RS", "LOT",
    "ALT", "PE", "VC", "IBKR", "ATH", "IMO", "NDA", "RELIEF", "COVID", "YTD",
    "MASH", "RUG", "PULL", "PS", "TN", "CUSIP", "FTD", "UCSF", "DO", "IDK",
    "IP", "PR", "IR", "SOME", "GAP", "KEY", "FAST", "DAY", "ANY", "AM", "CALL",
    "PUT", "EXP", "DNN", "MAG", "ARE", "WE", "MA", "MAN", "UP", "DOWN", "AX",
    "LSE", "AMEX", "AMS", "NEVER", "EVER", "COULD", "BE", "NEXT", "IQ", "PB",
    "API", "III", "II", "GL", "ALL", "BIO", "LOW", "BEWARE", "HERE", "INFO",
    "TOUR", "TOP", "BACK", "HOOD", "PD", "PM", "EST", "ICE", "MAGA", "TS", "SCI",
    "DTE", "CC", "NOW", "GO", "EOD", "TACO", "EU", "IRS", "GOOD", "BAD", "LINK",
    "DNA", "CPU", "GPU", "RAM", "SSD", "HDD", "CTO", "ASX", "ARR", "SO",
];

/// 티커 후보에서 제외할 토큰 목록.
///
/// 생성 시점에 주입되는 불변 값입니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenyList {
    version: String,
    tokens: HashSet<String>,
}

impl DenyList {
    /// 기본 제외 목록.
    pub fn canonical() -> Self {
        Self::from_tokens(
            CANONICAL_DENY_LIST_VERSION,
            CANONICAL_DENY_LIST.iter().copied(),
        )
    }

    /// 토큰 목록으로 생성합니다. 토큰은 대문자로 정규화됩니다.
    pub fn from_tokens<I, S>(version: impl Into<String>, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            version: version.into(),
            tokens: tokens
                .into_iter()
                .map(|t| t.as_ref().trim().to_uppercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// 파일에서 로드합니다.
    ///
    /// 한 줄에 토큰 하나, `#`으로 시작하는 줄은 주석입니다.
    /// 첫 줄이 `# version: <v>` 형식이면 버전으로 사용하고, 없으면 파일명을 사용합니다.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("제외 목록 읽기 실패 ({}): {}", path.display(), e))
        })?;

        let version = text
            .lines()
            .next()
            .and_then(|line| line.trim().strip_prefix("# version:"))
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let tokens = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'));

        Ok(Self::from_tokens(version, tokens))
    }

    /// 목록 버전.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// 토큰 수.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// 제외 대상인지 확인합니다.
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }
}

impl Default for DenyList {
    fn default() -> Self {
        Self::canonical()
    }
}

/// 티커 후보 추출기.
#[derive(Debug, Clone)]
pub struct TickerExtractor {
    pattern: Regex,
    deny_list: DenyList,
}

impl TickerExtractor {
    /// 제외 목록을 주입하여 생성합니다.
    pub fn new(deny_list: DenyList) -> Self {
        Self {
            // 고정 패턴이므로 컴파일 실패는 불가능
            pattern: Regex::new(r"\$?\b([A-Z]{2,7})\b").expect("ticker pattern"),
            deny_list,
        }
    }

    /// 주입된 제외 목록.
    pub fn deny_list(&self) -> &DenyList {
        &self.deny_list
    }

    /// 본문에서 티커 후보를 첫 등장 순서대로 추출합니다.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut tickers = Vec::new();

        for caps in self.pattern.captures_iter(text) {
            let Some(m) = caps.get(1) else {
                continue;
            };
            let ticker = m.as_str().to_uppercase();

            if self.deny_list.contains(&ticker) || !seen.insert(ticker.clone()) {
                continue;
            }
            tickers.push(ticker);
        }

        tickers
    }
}

impl Default for TickerExtractor {
    fn default() -> Self {
        Self::new(DenyList::canonical())
    }
}
