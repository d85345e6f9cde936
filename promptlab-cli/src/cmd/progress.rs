use std::io::Write;

/// Redraws a single `Progress: [done/total] pct%` line on stderr.
pub fn progress_line() -> impl Fn(usize, usize) + Send + Sync + 'static {
    move |completed, total| {
        let percent = if total > 0 { (completed * 100) / total } else { 0 };
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "\rProgress: [{completed}/{total}] {percent}%");
        if completed == total {
            let _ = writeln!(err);
        }
        let _ = err.flush();
    }
}
