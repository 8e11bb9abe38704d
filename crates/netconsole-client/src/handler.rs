use netconsole_frame::Record;

/// Receives every decoded record, one at a time, on the reader thread.
///
/// Implemented for any `FnMut(Record) + Send` closure.
pub trait RecordHandler: Send + 'static {
    fn handle(&mut self, record: Record);
}

impl<F> RecordHandler for F
where
    F: FnMut(Record) + Send + 'static,
{
    fn handle(&mut self, record: Record) {
        self(record)
    }
}
