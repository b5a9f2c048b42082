//! Buffered write path shared by the concrete sinks
//!
//! A [`Pipeline`] owns a sink's buffer together with its [`Destination`]. Appending,
//! deciding whether to flush and flushing all happen while the sink's [`WriteLock`] is
//! held, so concurrent callers never interleave partial messages.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::Result;
use crate::level::Severity;

use super::base::SinkSettings;
use super::buffer::{LogBuffer, WriteLock};

/// Where flushed text ends up
pub trait Destination: Send {
    /// Write the whole buffered text. Returning an error keeps the buffer intact.
    fn write_buffered(&mut self, text: &str) -> Result<()>;
}

struct PipelineState<D> {
    buffer: LogBuffer,
    destination: D,
}

impl<D: Destination> PipelineState<D> {
    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.destination.write_buffered(self.buffer.as_str())?;
        self.buffer.clear();
        Ok(())
    }
}

/// Buffer, destination and lock of one sink
pub struct Pipeline<D: Destination> {
    settings: SinkSettings,
    lock: WriteLock,
    state: Mutex<PipelineState<D>>,
}

impl<D: Destination> Pipeline<D> {
    pub fn new(settings: SinkSettings, destination: D, lock: WriteLock) -> Self {
        Self {
            settings,
            lock,
            state: Mutex::new(PipelineState {
                buffer: LogBuffer::new(),
                destination,
            }),
        }
    }

    pub fn settings(&self) -> &SinkSettings {
        &self.settings
    }

    pub fn write_lock(&self) -> &WriteLock {
        &self.lock
    }

    fn state(&self) -> MutexGuard<'_, PipelineState<D>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a rendered message and flush according to the policy
    pub fn log_message(&self, level: Severity, message: &str) -> Result<()> {
        if !self.settings.accepts(level) || message.is_empty() {
            return Ok(());
        }
        let policy = self.settings.flush_policy();

        let _serial = self.lock.acquire();
        let mut state = self.state();
        state.buffer.append(message);

        if policy.should_flush(level, state.buffer.len()) {
            state.flush()
        } else {
            Ok(())
        }
    }

    /// Flush whatever is buffered; a no-op on an empty buffer
    pub fn flush_buffer(&self) -> Result<()> {
        let _serial = self.lock.acquire();
        self.state().flush()
    }

    /// Run `f` against the destination while holding the write lock, bypassing the buffer
    pub fn with_destination<T>(&self, f: impl FnOnce(&mut D) -> T) -> T {
        let _serial = self.lock.acquire();
        f(&mut self.state().destination)
    }

    /// Bytes currently waiting in the buffer
    pub fn buffered_len(&self) -> usize {
        let _serial = self.lock.acquire();
        self.state().buffer.len()
    }
}

impl<D: Destination> Drop for Pipeline<D> {
    fn drop(&mut self) {
        let _serial = self.lock.acquire();
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = state.flush() {
            tracing::warn!(
                logger = %self.settings.name(),
                error = %e,
                "Dropping sink with unflushed log output"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LogError;
    use crate::sink::buffer::FlushPolicy;
    use std::io;
    use std::sync::Arc;
    use std::thread;

    /// Destination recording every flushed chunk
    #[derive(Clone, Default)]
    struct Recorder {
        chunks: Arc<Mutex<Vec<String>>>,
        fail: Arc<Mutex<bool>>,
    }

    impl Recorder {
        fn chunks(&self) -> Vec<String> {
            self.chunks.lock().unwrap().clone()
        }

        fn joined(&self) -> String {
            self.chunks().concat()
        }

        fn set_failing(&self, fail: bool) {
            *self.fail.lock().unwrap() = fail;
        }
    }

    impl Destination for Recorder {
        fn write_buffered(&mut self, text: &str) -> Result<()> {
            if *self.fail.lock().unwrap() {
                return Err(LogError::io(
                    "recorder",
                    io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
                ));
            }
            self.chunks.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn pipeline(max_level: Severity, policy: FlushPolicy) -> (Pipeline<Recorder>, Recorder) {
        let recorder = Recorder::default();
        let settings = SinkSettings::new("pipeline-test", max_level, policy);
        (
            Pipeline::new(settings, recorder.clone(), WriteLock::new()),
            recorder,
        )
    }

    #[test]
    fn test_above_max_level_is_discarded() {
        let (pipeline, recorder) = pipeline(Severity::Warning, FlushPolicy::new(0, true));

        pipeline.log_message(Severity::Error, "dropped").unwrap();
        pipeline.log_message(Severity::Trace, "dropped").unwrap();

        assert_eq!(pipeline.buffered_len(), 0);
        assert!(recorder.chunks().is_empty());
    }

    #[test]
    fn test_zero_buffer_flushes_every_append() {
        let (pipeline, recorder) = pipeline(Severity::Trace, FlushPolicy::new(0, false));

        pipeline.log_message(Severity::Info, "one").unwrap();
        pipeline.log_message(Severity::Info, "two").unwrap();

        assert_eq!(recorder.chunks(), vec!["one\n", "two\n"]);
        assert_eq!(pipeline.buffered_len(), 0);
    }

    #[test]
    fn test_flushes_when_threshold_reached() {
        let (pipeline, recorder) = pipeline(Severity::Trace, FlushPolicy::new(12, false));

        pipeline.log_message(Severity::Info, "aaaa").unwrap();
        assert_eq!(pipeline.buffered_len(), 5);
        assert!(recorder.chunks().is_empty());

        // 5 + 7 = 12 bytes reaches the threshold before the call returns
        pipeline.log_message(Severity::Info, "bbbbbb").unwrap();
        assert_eq!(recorder.chunks(), vec!["aaaa\nbbbbbb\n"]);
        assert_eq!(pipeline.buffered_len(), 0);
    }

    #[test]
    fn test_bad_level_forces_flush() {
        let (pipeline, recorder) = pipeline(Severity::Trace, FlushPolicy::new(4096, false));

        pipeline.log_message(Severity::Info, "queued").unwrap();
        assert!(recorder.chunks().is_empty());

        pipeline.log_message(Severity::Error, "failed").unwrap();
        assert_eq!(recorder.joined(), "queued\nfailed\n");
    }

    #[test]
    fn test_flush_after_write() {
        let (pipeline, recorder) = pipeline(Severity::Trace, FlushPolicy::new(4096, true));

        pipeline.log_message(Severity::Ok, "fine").unwrap();
        assert_eq!(recorder.joined(), "fine\n");
    }

    #[test]
    fn test_flush_twice_writes_once() {
        let (pipeline, recorder) = pipeline(Severity::Trace, FlushPolicy::new(4096, false));

        pipeline.log_message(Severity::Info, "once").unwrap();
        pipeline.flush_buffer().unwrap();
        pipeline.flush_buffer().unwrap();

        assert_eq!(recorder.chunks(), vec!["once\n"]);
    }

    #[test]
    fn test_empty_message_ignored() {
        let (pipeline, recorder) = pipeline(Severity::Trace, FlushPolicy::new(0, true));

        pipeline.log_message(Severity::Info, "").unwrap();
        assert!(recorder.chunks().is_empty());
    }

    #[test]
    fn test_failed_flush_keeps_buffer() {
        let (pipeline, recorder) = pipeline(Severity::Trace, FlushPolicy::new(4096, false));

        pipeline.log_message(Severity::Info, "precious").unwrap();
        recorder.set_failing(true);
        assert!(pipeline.flush_buffer().is_err());
        assert_eq!(pipeline.buffered_len(), "precious\n".len());

        recorder.set_failing(false);
        pipeline.flush_buffer().unwrap();
        assert_eq!(recorder.joined(), "precious\n");
        assert_eq!(pipeline.buffered_len(), 0);
    }

    #[test]
    fn test_drop_flushes_remaining_output() {
        let (pipeline, recorder) = pipeline(Severity::Trace, FlushPolicy::new(4096, false));

        pipeline.log_message(Severity::Info, "last words").unwrap();
        drop(pipeline);

        assert_eq!(recorder.joined(), "last words\n");
    }

    #[test]
    fn test_concurrent_appends_do_not_interleave() {
        let (pipeline, recorder) = pipeline(Severity::Trace, FlushPolicy::new(256, false));
        let pipeline = Arc::new(pipeline);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let pipeline = Arc::clone(&pipeline);
                thread::spawn(move || {
                    for i in 0..100 {
                        let msg = format!("thread-{}-message-{}", t, i);
                        pipeline.log_message(Severity::Info, &msg).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        pipeline.flush_buffer().unwrap();

        let output = recorder.joined();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 800);
        for line in lines {
            assert!(line.starts_with("thread-"));
            assert_eq!(line.matches("-message-").count(), 1);
        }
    }

    #[test]
    fn test_with_destination_bypasses_buffer() {
        let (pipeline, recorder) = pipeline(Severity::Trace, FlushPolicy::new(4096, false));

        pipeline.log_message(Severity::Info, "buffered").unwrap();
        pipeline
            .with_destination(|d| d.write_buffered("direct\n"))
            .unwrap();

        assert_eq!(recorder.joined(), "direct\n");
        assert_eq!(pipeline.buffered_len(), "buffered\n".len());
    }
}
