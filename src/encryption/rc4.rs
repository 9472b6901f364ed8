//! RC4 stream cipher (revisions 2 and 3 of the standard security handler).

/// RC4 keystream state.
pub struct Rc4 {
    state: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4 {
    /// Run the key schedule. `key` must not be empty.
    pub fn new(key: &[u8]) -> Self {
        let mut state = [0u8; 256];
        state
            .iter_mut()
            .enumerate()
            .for_each(|(idx, v)| *v = idx as u8);
        if !key.is_empty() {
            let mut j = 0u8;
            for idx in 0..256 {
                j = j.wrapping_add(state[idx]).wrapping_add(key[idx % key.len()]);
                state.swap(idx, j as usize);
            }
        }
        Self { state, i: 0, j: 0 }
    }

    /// XOR the keystream into `data`.
    pub fn process(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            self.i = self.i.wrapping_add(1);
            self.j = self.j.wrapping_add(self.state[self.i as usize]);
            self.state.swap(self.i as usize, self.j as usize);
            let k = self.state[self.i as usize].wrapping_add(self.state[self.j as usize]);
            *byte ^= self.state[k as usize];
        }
    }
}

/// Encrypt or decrypt data using RC4 (the operation is symmetric).
pub fn rc4_crypt(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    Rc4::new(key).process(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        assert_eq!(
            rc4_crypt(b"Key", b"Plaintext"),
            vec![0xBB, 0xF3, 0x16, 0xE8, 0xD9, 0x40, 0xAF, 0x0A, 0xD3]
        );
        assert_eq!(rc4_crypt(b"Wiki", b"pedia"), vec![0x10, 0x21, 0xBF, 0x04, 0x20]);
    }

    #[test]
    fn test_symmetric() {
        let cipher = rc4_crypt(b"secret", b"Hello, World!");
        assert_ne!(&cipher[..], b"Hello, World!");
        assert_eq!(rc4_crypt(b"secret", &cipher), b"Hello, World!");
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let mut rc4 = Rc4::new(b"Key");
        let mut first = *b"Plain";
        let mut second = *b"text";
        rc4.process(&mut first);
        rc4.process(&mut second);
        let mut joined = first.to_vec();
        joined.extend_from_slice(&second);
        assert_eq!(joined, rc4_crypt(b"Key", b"Plaintext"));
    }
}
