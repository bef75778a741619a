//! 进度通知
//!
//! 导入和导出过程通过显式传入的进度接收者报告进度，不依赖全局事件。

/// 进度消息的接收者
pub trait Progress: Send + Sync {
    /// 报告一条进度消息
    fn report(&self, message: &str);
}

impl<F> Progress for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, message: &str) {
        self(message)
    }
}

/// 把进度消息写入日志
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl Progress for TracingProgress {
    fn report(&self, message: &str) {
        tracing::info!(target: "bookpack::progress", "{}", message);
    }
}

/// 丢弃所有进度消息
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentProgress;

impl Progress for SilentProgress {
    fn report(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_closure_progress() {
        let messages = Mutex::new(Vec::new());
        let progress = |message: &str| messages.lock().push(message.to_string());

        let sink: &dyn Progress = &progress;
        sink.report("一");
        sink.report("二");
        SilentProgress.report("丢弃");

        assert_eq!(*messages.lock(), vec!["一", "二"]);
    }
}
