use super::error::Result;

/// A transfer carried out in steps, e.g. one bulk transfer per chunk of a stream.
///
/// Iterating an operation performs one step per call to `next` and yields the running number of
/// bytes transferred. After the first error the iterator is fused.
pub trait Operation: Iterator<Item = Result<usize>> {
    /// Number of bytes transferred by all successful steps so far.
    fn transferred(&self) -> usize;

    /// Runs all remaining steps and returns the total number of bytes transferred.
    fn execute(&mut self) -> Result<usize> {
        while let Some(step) = self.next() {
            step?;
        }
        Ok(self.transferred())
    }
}
