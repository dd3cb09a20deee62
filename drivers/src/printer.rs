/*++

Licensed under the Apache-2.0 license.

File Name:

    printer.rs

Abstract:

    File contains the diagnostic print macros of the driver.

--*/
use core::convert::Infallible;
use ufmt::{uDisplay, uWrite};

/// Diagnostic sink. Output is discarded unless the `std` feature is on.
#[derive(Default)]
pub struct Printer;

cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
        fn emit(str: &str) {
            print!("{str}");
        }
    } else {
        #[inline(never)]
        fn emit(_str: &str) {}
    }
}

impl uWrite for Printer {
    type Error = Infallible;

    fn write_str(&mut self, str: &str) -> Result<(), Self::Error> {
        emit(str);
        Ok(())
    }
}

#[macro_export]
macro_rules! cprint {
    ($($tt:tt)*) => {{
        let _ = ufmt::uwrite!(&mut $crate::printer::Printer::default(), $($tt)*);
    }}
}

#[macro_export]
macro_rules! cprintln {
    ($($tt:tt)*) => {{
        let _ = ufmt::uwriteln!(&mut $crate::printer::Printer::default(), $($tt)*);
    }}
}

/// Formats a byte slice as upper-case hex.
pub struct HexBytes<'a>(pub &'a [u8]);

impl uDisplay for HexBytes<'_> {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
        for &x in self.0.iter() {
            f.write_char(DIGITS[(x >> 4) as usize] as char)?;
            f.write_char(DIGITS[(x & 0xf) as usize] as char)?;
        }
        Ok(())
    }
}
