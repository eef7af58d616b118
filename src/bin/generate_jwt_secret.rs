use rand::RngCore;

/// Bytes of entropy in a generated session signing key.
const KEY_BYTES: usize = 32;

fn main() {
    println!("🔐 Session Secret Generator");
    println!("===========================");

    // 256-bit key for signing sessionid cookies (HS256)
    let mut key = [0u8; KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut key);
    let hex_key = hex::encode(key);

    println!();
    println!("📝 Copy this line to your .env file:");
    println!("JWT_SECRET={}", hex_key);
    println!();
    println!("Rotating this value logs every user out.");
}
