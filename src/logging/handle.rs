use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;

/// Handle для управления lifecycle логирования.
///
/// Держит guard неблокирующего файлового writer'а: пока handle жив, записи
/// доходят до файла; при drop буфер сбрасывается.
pub struct LoggingHandle {
    _file_guard: Option<WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingHandle {
    pub fn new(
        file_guard: Option<WorkerGuard>,
        log_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            _file_guard: file_guard,
            log_dir,
        }
    }

    /// Handle без файлового sink'а.
    pub fn console_only() -> Self {
        Self::new(None, None)
    }

    pub fn has_file_sink(&self) -> bool {
        self._file_guard.is_some()
    }

    pub fn log_dir(&self) -> Option<&PathBuf> {
        self.log_dir.as_ref()
    }

    /// Явное завершение: пишет итоговую запись и сбрасывает файловый буфер.
    pub fn shutdown(self) {
        tracing::info!(
            file_sink = self.has_file_sink(),
            "Logging system shutting down"
        );
        drop(self);
    }
}

impl std::fmt::Debug for LoggingHandle {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("LoggingHandle")
            .field("file_sink", &self.has_file_sink())
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_only_handle() {
        let handle = LoggingHandle::console_only();
        assert!(!handle.has_file_sink());
        assert!(handle.log_dir().is_none());
        handle.shutdown();
    }

    /// Тест проверяет, что guard держит writer и сбрасывает его при drop.
    #[test]
    fn test_guard_flushes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let appender = tracing_appender::rolling::never(dir.path(), "out.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let handle = LoggingHandle::new(Some(guard), Some(dir.path().to_path_buf()));
        assert!(handle.has_file_sink());

        {
            use std::io::Write;
            let mut writer = writer;
            writer.write_all(b"flushed line\n").unwrap();
        }
        drop(handle);

        let written = std::fs::read_to_string(dir.path().join("out.log")).unwrap();
        assert!(written.contains("flushed line"));
    }
}
