use super::{CodeError, CodeResult};
use rand::rngs::OsRng;
use rand::RngCore;

const DIGITS: &[u8] = b"0123456789";
const ALPHANUMERIC: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub const MAX_CODE_LENGTH: usize = 64;

/// Random code generator backed by the operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeGenerator;

impl CodeGenerator {
    pub fn alphabet(allow_letters: bool) -> &'static [u8] {
        if allow_letters {
            ALPHANUMERIC
        } else {
            DIGITS
        }
    }

    /// Generate `length` characters drawn uniformly from the alphabet.
    ///
    /// Bytes at or above the largest multiple of the alphabet size are
    /// rejected so every symbol has the same probability.
    pub fn generate(&self, length: usize, allow_letters: bool) -> CodeResult<String> {
        if length == 0 || length > MAX_CODE_LENGTH {
            return Err(CodeError::Validation(format!(
                "code length must be between 1 and {}",
                MAX_CODE_LENGTH
            )));
        }

        let alphabet = Self::alphabet(allow_letters);
        let n = alphabet.len();
        let limit = 256 - (256 % n);

        let mut code = String::with_capacity(length);
        let mut buf = [0u8; 64];
        while code.len() < length {
            OsRng
                .try_fill_bytes(&mut buf)
                .map_err(|e| CodeError::Generation(e.to_string()))?;

            for &b in buf.iter() {
                if (b as usize) >= limit {
                    continue;
                }
                code.push(alphabet[b as usize % n] as char);
                if code.len() == length {
                    break;
                }
            }
        }

        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_and_alphabet() {
        let gen = CodeGenerator;
        for len in [1, 6, 32, MAX_CODE_LENGTH] {
            let code = gen.generate(len, false).unwrap();
            assert_eq!(code.len(), len);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }

        let code = gen.generate(40, true).unwrap();
        assert_eq!(code.len(), 40);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_rejects_out_of_range_length() {
        let gen = CodeGenerator;
        assert!(matches!(gen.generate(0, false), Err(CodeError::Validation(_))));
        assert!(matches!(
            gen.generate(MAX_CODE_LENGTH + 1, true),
            Err(CodeError::Validation(_))
        ));
    }

    #[test]
    fn test_codes_differ() {
        let gen = CodeGenerator;
        let a = gen.generate(32, true).unwrap();
        let b = gen.generate(32, true).unwrap();
        assert_ne!(a, b);
    }
}
