//! 로그 파일 추적기
//!
//! 로그 파일을 감시하며 새로운 라인이 추가되면 수집합니다.
//! `tail -f`와 유사한 동작을 비동기 방식으로 구현합니다.
//!
//! # 로테이션 감지
//! - inode 변경 감지 (logrotate 등). 새 파일로 전환하기 전에
//!   이전 파일에 남은 라인을 끝까지 수집합니다.
//! - 파일 크기 축소 감지 (truncation)
//! - 새 파일 자동 열기 (오프셋 0부터 다시 읽기)
//!
//! 시작 시에는 파일 끝으로 이동하므로 과거 라인은 수집하지 않습니다.
//! 과거 이벤트의 중복 방지는 재개 커서([`ResumeFilter`](crate::resume::ResumeFilter))의
//! 책임입니다.

use std::io::SeekFrom;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use metrics::counter;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use xlxmon_core::metrics as m;

use crate::config::ActivityConfig;
use crate::error::ActivityError;

/// 수집된 원시 로그 라인
///
/// 추적기가 생성하고, 분류기가 소비하는 중간 데이터 형식입니다.
/// 개행 문자는 포함하지 않습니다.
#[derive(Debug, Clone)]
pub struct RawLine {
    /// 원시 라인 바이트
    pub data: Bytes,
    /// 수집 시각
    pub received_at: SystemTime,
}

impl RawLine {
    /// 새 RawLine을 생성합니다.
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            received_at: SystemTime::now(),
        }
    }
}

/// 추적기 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailerStatus {
    /// 실행 대기 중
    Idle,
    /// 실행 중
    Running,
    /// 에러로 중단됨
    Error(String),
    /// 정상 종료됨
    Stopped,
}

/// 로그 파일 추적기
///
/// 지정된 파일을 주기적으로 폴링하여 새로운 로그 라인을 수집하고
/// `mpsc::Sender<RawLine>` 채널로 전달합니다.
/// 파일 로테이션(inode 변경, truncation)을 자동 감지합니다.
pub struct LogTailer {
    /// 추적기 설정
    config: ActivityConfig,
    /// 수집된 라인 전송 채널
    tx: mpsc::Sender<RawLine>,
    /// 현재 상태
    status: TailerStatus,
}

impl LogTailer {
    /// 새 로그 추적기를 생성합니다.
    pub fn new(config: ActivityConfig, tx: mpsc::Sender<RawLine>) -> Self {
        Self {
            config,
            tx,
            status: TailerStatus::Idle,
        }
    }

    /// 추적기를 시작합니다.
    ///
    /// 최초 파일 열기에 실패하면 에러를 반환합니다 (치명적).
    /// 이후의 로테이션 중 일시적 파일 부재는 다음 폴링에서 재시도합니다.
    /// cancellation token이 발동되면 정상 종료합니다.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), ActivityError> {
        self.status = TailerStatus::Running;

        if self.config.startup_delay_secs > 0 {
            debug!(
                delay_secs = self.config.startup_delay_secs,
                "waiting before opening log file"
            );
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(self.config.startup_delay_secs)) => {}
                _ = cancel.cancelled() => {
                    self.status = TailerStatus::Stopped;
                    return Ok(());
                }
            }
        }

        let mut file = match self.open_log_file().await {
            Ok(f) => f,
            Err(e) => {
                self.status = TailerStatus::Error(e.to_string());
                return Err(e);
            }
        };
        let mut inode = file_inode(&file).await?;
        // 과거 라인은 건너뛰고 파일 끝에서부터 추적 시작
        let mut offset = file.seek(SeekFrom::End(0)).await?;
        let mut partial: Vec<u8> = Vec::new();

        let mut interval = tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            path = %self.config.log_path.display(),
            offset,
            "tailing log file from end"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match tokio::fs::metadata(&self.config.log_path).await {
                        Ok(meta) => {
                            let current_inode = metadata_inode(&meta);
                            if current_inode != inode {
                                info!(
                                    path = %self.config.log_path.display(),
                                    "log rotation detected, reopening"
                                );
                                counter!(m::MONITOR_ROTATIONS_TOTAL).increment(1);
                                // 이전 핸들에 남은 라인을 모두 비운 뒤 새 파일로 전환
                                offset = self.drain_new_bytes(&mut file, offset, &mut partial).await?;
                                if !partial.is_empty() {
                                    let line = std::mem::take(&mut partial);
                                    self.dispatch_line(line).await?;
                                }
                                match self.open_log_file().await {
                                    Ok(f) => {
                                        file = f;
                                        inode = current_inode;
                                        offset = 0;
                                    }
                                    Err(e) => {
                                        warn!(error = %e, "failed to reopen rotated file, retrying");
                                        continue;
                                    }
                                }
                            } else if meta.len() < offset {
                                warn!(
                                    old_offset = offset,
                                    new_len = meta.len(),
                                    "log file truncated, rereading from start"
                                );
                                counter!(m::MONITOR_ROTATIONS_TOTAL).increment(1);
                                offset = file.seek(SeekFrom::Start(0)).await?;
                                partial.clear();
                            }
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                            // logrotate가 새 파일을 만들기 전의 짧은 공백
                            debug!("log file missing, waiting for recreation");
                            continue;
                        }
                        Err(e) => {
                            self.status = TailerStatus::Error(e.to_string());
                            return Err(e.into());
                        }
                    }

                    offset = self.drain_new_bytes(&mut file, offset, &mut partial).await?;
                }
                _ = cancel.cancelled() => {
                    info!("tailer received shutdown signal");
                    break;
                }
            }
        }

        self.status = TailerStatus::Stopped;
        Ok(())
    }

    /// 추적 대상 파일을 엽니다.
    async fn open_log_file(&self) -> Result<File, ActivityError> {
        File::open(&self.config.log_path)
            .await
            .map_err(|e| ActivityError::Tailer {
                path: self.config.log_path.display().to_string(),
                reason: e.to_string(),
            })
    }

    /// 현재 위치부터 파일 끝까지 읽어 완성된 라인을 전송합니다.
    ///
    /// 개행으로 끝나지 않은 꼬리는 `partial`에 보관했다가
    /// 다음 읽기에서 이어 붙입니다. 갱신된 오프셋을 반환합니다.
    async fn drain_new_bytes(
        &self,
        file: &mut File,
        mut offset: u64,
        partial: &mut Vec<u8>,
    ) -> Result<u64, ActivityError> {
        let mut buf = vec![0u8; 8192];
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            offset += n as u64;
            for &byte in &buf[..n] {
                if byte == b'\n' {
                    let line = std::mem::take(partial);
                    self.dispatch_line(line).await?;
                } else {
                    partial.push(byte);
                }
            }
        }
        Ok(offset)
    }

    /// 완성된 한 라인을 채널로 전송합니다.
    async fn dispatch_line(&self, mut line: Vec<u8>) -> Result<(), ActivityError> {
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.is_empty() {
            return Ok(());
        }
        if line.len() > self.config.max_line_length {
            warn!(
                length = line.len(),
                max = self.config.max_line_length,
                "line exceeds maximum length, truncating"
            );
            line.truncate(self.config.max_line_length);
        }

        counter!(m::MONITOR_LINES_COLLECTED_TOTAL).increment(1);

        self.tx
            .send(RawLine::new(Bytes::from(line)))
            .await
            .map_err(|e| ActivityError::Channel(e.to_string()))
    }

    /// 현재 상태를 반환합니다.
    pub fn status(&self) -> &TailerStatus {
        &self.status
    }
}

/// 열린 파일의 inode를 조회합니다.
async fn file_inode(file: &File) -> Result<u64, ActivityError> {
    let meta = file.metadata().await?;
    Ok(metadata_inode(&meta))
}

#[cfg(unix)]
fn metadata_inode(meta: &std::fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.ino()
}

#[cfg(not(unix))]
fn metadata_inode(_meta: &std::fs::Metadata) -> u64 {
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn test_config(path: &std::path::Path) -> ActivityConfig {
        ActivityConfig {
            log_path: path.to_path_buf(),
            poll_interval_ms: 10,
            startup_delay_secs: 0,
            ..Default::default()
        }
    }

    fn append(path: &std::path::Path, content: &str) {
        let mut f = std::fs::OpenOptions::new()
            .append(true)
            .open(path)
            .unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
    }

    async fn recv_line(rx: &mut mpsc::Receiver<RawLine>) -> String {
        let line = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for line")
            .expect("channel closed");
        String::from_utf8(line.data.to_vec()).unwrap()
    }

    #[test]
    fn tailer_starts_idle() {
        let (tx, _rx) = mpsc::channel(10);
        let tailer = LogTailer::new(ActivityConfig::default(), tx);
        assert_eq!(*tailer.status(), TailerStatus::Idle);
    }

    #[tokio::test]
    async fn missing_file_is_fatal_on_startup() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = mpsc::channel(10);
        let tailer = LogTailer::new(test_config(&dir.path().join("nonexistent.log")), tx);
        let result = tailer.run(CancellationToken::new()).await;
        assert!(matches!(result, Err(ActivityError::Tailer { .. })));
    }

    #[tokio::test]
    async fn reads_appended_lines_but_not_existing_ones() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");
        std::fs::write(&path, "old line\n").unwrap();

        let (tx, mut rx) = mpsc::channel(10);
        let tailer = LogTailer::new(test_config(&path), tx);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(tailer.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        append(&path, "new line 1\nnew line 2\n");

        assert_eq!(recv_line(&mut rx).await, "new line 1");
        assert_eq!(recv_line(&mut rx).await, "new line 2");

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn buffers_partial_line_until_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");
        std::fs::write(&path, "").unwrap();

        let (tx, mut rx) = mpsc::channel(10);
        let tailer = LogTailer::new(test_config(&path), tx);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(tailer.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        append(&path, "incomplete");
        tokio::time::sleep(Duration::from_millis(100)).await;

        // 개행이 없으므로 아직 전달되지 않아야 함
        assert!(rx.try_recv().is_err());

        append(&path, " line\n");
        assert_eq!(recv_line(&mut rx).await, "incomplete line");

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn detects_truncation_and_rereads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");
        std::fs::write(&path, "padding content to give the file some length\n").unwrap();

        let (tx, mut rx) = mpsc::channel(10);
        let tailer = LogTailer::new(test_config(&path), tx);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(tailer.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        // truncation: 파일을 더 짧은 내용으로 교체
        std::fs::write(&path, "fresh\n").unwrap();

        assert_eq!(recv_line(&mut rx).await, "fresh");

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn detects_rotation_and_follows_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");
        std::fs::write(&path, "before rotation\n").unwrap();

        let (tx, mut rx) = mpsc::channel(10);
        let tailer = LogTailer::new(test_config(&path), tx);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(tailer.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        std::fs::rename(&path, dir.path().join("test.log.1")).unwrap();
        std::fs::write(&path, "after rotation\n").unwrap();

        assert_eq!(recv_line(&mut rx).await, "after rotation");

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn delivers_lines_written_just_before_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");
        std::fs::write(&path, "before rotation\n").unwrap();

        let (tx, mut rx) = mpsc::channel(10);
        let tailer = LogTailer::new(test_config(&path), tx);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(tailer.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        // 마지막 라인 기록과 로테이션이 한 폴링 주기 안에 일어나는 경우
        append(&path, "closing line in old file\n");
        std::fs::rename(&path, dir.path().join("test.log.1")).unwrap();
        std::fs::write(&path, "first line in new file\n").unwrap();

        assert_eq!(recv_line(&mut rx).await, "closing line in old file");
        assert_eq!(recv_line(&mut rx).await, "first line in new file");

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn flushes_unterminated_tail_on_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");
        std::fs::write(&path, "").unwrap();

        let (tx, mut rx) = mpsc::channel(10);
        let tailer = LogTailer::new(test_config(&path), tx);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(tailer.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        // 이전 파일이 개행 없이 끝나면 그 꼬리도 한 라인으로 전달되어야 함
        append(&path, "tail without newline");
        std::fs::rename(&path, dir.path().join("test.log.1")).unwrap();
        std::fs::write(&path, "after rotation\n").unwrap();

        assert_eq!(recv_line(&mut rx).await, "tail without newline");
        assert_eq!(recv_line(&mut rx).await, "after rotation");

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn truncates_oversized_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");
        std::fs::write(&path, "").unwrap();

        let mut config = test_config(&path);
        config.max_line_length = 16;
        let (tx, mut rx) = mpsc::channel(10);
        let tailer = LogTailer::new(config, tx);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(tailer.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        append(&path, &format!("{}\n", "x".repeat(100)));

        let line = recv_line(&mut rx).await;
        assert_eq!(line.len(), 16);

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn cancellation_stops_tailer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");
        std::fs::write(&path, "").unwrap();

        let (tx, _rx) = mpsc::channel(10);
        let tailer = LogTailer::new(test_config(&path), tx);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(tailer.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("tailer did not stop in time")
            .unwrap();
        assert!(result.is_ok());
    }
}
