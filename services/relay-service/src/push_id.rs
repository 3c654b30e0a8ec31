use rand::Rng;

/// Alphabet ordered by ASCII value so generated ids sort lexicographically.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";
const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

/// Generates Firebase-style push ids: 8 characters of millisecond timestamp
/// followed by 12 random characters. Ids minted within the same millisecond
/// bump the previous random suffix so the sequence stays strictly increasing.
pub struct PushIdGenerator {
    last_millis: u64,
    last_random: [u8; RANDOM_CHARS],
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self {
            last_millis: 0,
            last_random: [0; RANDOM_CHARS],
        }
    }

    pub fn next_id(&mut self, now_millis: u64) -> String {
        // Clock going backwards is treated like a repeat of the last millisecond.
        let millis = now_millis.max(self.last_millis);
        if millis == self.last_millis && self.last_millis != 0 {
            increment(&mut self.last_random);
        } else {
            let mut rng = rand::thread_rng();
            for slot in self.last_random.iter_mut() {
                *slot = rng.gen_range(0..64);
            }
        }
        self.last_millis = millis;

        let mut id = String::with_capacity(TIME_CHARS + RANDOM_CHARS);
        let mut time_chars = [0u8; TIME_CHARS];
        let mut remaining = millis;
        for slot in time_chars.iter_mut().rev() {
            *slot = PUSH_CHARS[(remaining % 64) as usize];
            remaining /= 64;
        }
        id.extend(time_chars.iter().map(|&byte| byte as char));
        id.extend(
            self.last_random
                .iter()
                .map(|&index| PUSH_CHARS[index as usize] as char),
        );
        id
    }
}

impl Default for PushIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn increment(digits: &mut [u8; RANDOM_CHARS]) {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}
