//! 수집 통계 구조체.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 수집 작업 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    /// 총 처리 대상 수
    pub total: usize,
    /// 성공 횟수
    pub success: usize,
    /// 에러 횟수
    pub errors: usize,
    /// 건너뛴 횟수 (작성자 없음, 지원하지 않는 심볼 등)
    pub skipped: usize,
    /// 이미 수집된 항목
    pub duplicates: usize,
    /// 빈 데이터 (조회 성공, 데이터 없음)
    pub empty: usize,
    /// 새로 저장된 멘션 수
    pub mentions: usize,
    /// 제한 시간 초과로 중단됨
    pub timed_out: bool,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CollectionStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.success as f64 / self.total as f64) * 100.0
        }
    }

    /// 다른 통계를 합산
    pub fn merge(&mut self, other: &CollectionStats) {
        self.total += other.total;
        self.success += other.success;
        self.errors += other.errors;
        self.skipped += other.skipped;
        self.duplicates += other.duplicates;
        self.empty += other.empty;
        self.mentions += other.mentions;
        self.timed_out |= other.timed_out;
        self.elapsed += other.elapsed;
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            success = self.success,
            errors = self.errors,
            skipped = self.skipped,
            duplicates = self.duplicates,
            empty = self.empty,
            mentions = self.mentions,
            timed_out = self.timed_out,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "수집 완료"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let mut stats = CollectionStats::new();
        assert_eq!(stats.success_rate(), 0.0);

        stats.total = 4;
        stats.success = 3;
        assert_eq!(stats.success_rate(), 75.0);
    }

    #[test]
    fn test_merge() {
        let mut a = CollectionStats {
            total: 2,
            mentions: 1,
            ..Default::default()
        };
        let b = CollectionStats {
            total: 3,
            errors: 1,
            timed_out: true,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.total, 5);
        assert_eq!(a.errors, 1);
        assert_eq!(a.mentions, 1);
        assert!(a.timed_out);
    }
}
