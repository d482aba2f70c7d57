//! EDID and E-DDC reads. These address the EEPROM (0x50) and segment
//! register (0x30) directly, outside the DDC/CI command channel, so they
//! borrow the transport's I2C device rather than going through
//! [`ddc_core::Transport`].

use std::cmp;

use ddc_core::packet::{I2C_ADDRESS_DDC_CI, I2C_ADDRESS_EDID, I2C_ADDRESS_EDID_SEGMENT};
use ddc_core::transport::TransportError;
use i2c::{Address, BlockTransfer, BulkTransfer, Message};
use resize_slice::ResizeSlice;

use crate::transport::{map_io_error, I2cTransport};

impl I2cTransport {
    /// Read up to `data.len()` bytes of EDID starting at `offset`, using
    /// repeated I2C block reads. Restores the DDC/CI slave address before
    /// returning so the transport remains usable for ordinary exchanges.
    pub fn read_edid(&mut self, mut offset: u8, mut data: &mut [u8]) -> Result<usize, TransportError> {
        let device = self.device_mut();
        device
            .set_slave_address(I2C_ADDRESS_EDID, false)
            .map_err(map_io_error)?;

        let mut len = 0;
        let result: Result<usize, TransportError> = (|| {
            while !data.is_empty() {
                let chunk_len = cmp::min(0x80, data.len());
                let read = device
                    .i2c_read_block_data(offset, &mut data[..chunk_len])
                    .map_err(map_io_error)?;
                if read == 0 {
                    break;
                }
                len += read;
                offset = match offset.checked_add(read as u8) {
                    Some(offset) => offset,
                    None => break,
                };
                data.resize_from(read);
            }
            Ok(len)
        })();

        device
            .set_slave_address(I2C_ADDRESS_DDC_CI, false)
            .map_err(map_io_error)?;

        result
    }

    /// Read part of the EDID through an E-DDC segment, addressing the
    /// segment register (0x30) and the EEPROM (0x50) in a single combined
    /// I2C transaction.
    pub fn read_eddc_edid(&mut self, segment: u8, offset: u8, data: &mut [u8]) -> Result<usize, TransportError> {
        let device = self.device_mut();
        let mut msgs = [
            Message::Write {
                address: I2C_ADDRESS_EDID_SEGMENT,
                data: &[segment],
                flags: Default::default(),
            },
            Message::Write {
                address: I2C_ADDRESS_EDID,
                data: &[offset],
                flags: Default::default(),
            },
            Message::Read {
                address: I2C_ADDRESS_EDID,
                data,
                flags: Default::default(),
            },
        ];
        device.i2c_transfer(&mut msgs).map_err(map_io_error)?;
        Ok(msgs[2].len())
    }
}
