/*!
    adapter running a link role on a bare-metal uart through embedded-io-async.
*/

use embedded_io_async::{Read, ReadReady, Write};

use crate::hal::SerialLink;

/// exposes any embedded-io-async uart as a [SerialLink]
pub struct EmbeddedLink<T>(pub T);

impl<T: Read + Write + ReadReady> SerialLink for EmbeddedLink<T> {
    type Error = T::Error;

    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.0.write_all(bytes).await
    }
    async fn has_data(&mut self) -> Result<bool, Self::Error> {
        self.0.read_ready()
    }
    async fn read(&mut self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        self.0.read(buffer).await
    }
}
