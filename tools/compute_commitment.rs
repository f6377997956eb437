//! Tool to compute a payment commitment exactly as the payment circuit does
//! Run with: cargo run --release -- <amount> <secretNonce> <viewX> <viewY> <spendX> <spendY> <paymentType> <startDate> <endDate>
//!
//! All inputs are decimal BN254 field elements. With no arguments the
//! reference vector is used.

use std::process::ExitCode;
use std::str::FromStr;

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use light_poseidon::{Poseidon, PoseidonHasher};

const INPUT_NAMES: [&str; 9] = [
    "amount",
    "secretNonce",
    "pubViewKeyX",
    "pubViewKeyY",
    "pubSpendKeyX",
    "pubSpendKeyY",
    "paymentType",
    "startDate",
    "endDate",
];

// Keys of the reference identity (view 0x1234..124a, spend 0xabcd..ac04)
const REFERENCE_VECTOR: [&str; 9] = [
    "1000",
    "999888777",
    "4178174794538738040567597491452478967128737098647987197742705323176204713782",
    "6787840150649645986734433259635895200883972850680136265518639748879930425531",
    "10326957622098166519356092102239718310155805008286995093495180664975028576029",
    "1354541141303704063259123249638005442372278472021291810258463354978080386759",
    "2",
    "1700000000",
    "1702592000",
];

fn parse_input(name: &str, text: &str) -> Result<Fr, String> {
    let value = Fr::from_str(text).map_err(|_| format!("{name}: not a decimal integer: {text}"))?;
    // from_str reduces modulo p; reject anything that did not survive unchanged
    if value.into_bigint().to_string() != text {
        return Err(format!("{name}: not a canonical field element: {text}"));
    }
    Ok(value)
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let inputs: Vec<&str> = if args.is_empty() {
        println!("// No inputs given, using the reference vector");
        REFERENCE_VECTOR.to_vec()
    } else if args.len() == INPUT_NAMES.len() {
        args.iter().map(String::as_str).collect()
    } else {
        eprintln!("expected {} inputs: {}", INPUT_NAMES.len(), INPUT_NAMES.join(" "));
        return ExitCode::FAILURE;
    };

    let mut elements = Vec::with_capacity(INPUT_NAMES.len());
    for (name, text) in INPUT_NAMES.iter().zip(&inputs) {
        match parse_input(name, text) {
            Ok(value) => {
                println!("{:>13} = {}", name, text);
                elements.push(value);
            }
            Err(message) => {
                eprintln!("{message}");
                return ExitCode::FAILURE;
            }
        }
    }

    let commitment = match Poseidon::<Fr>::new_circom(INPUT_NAMES.len()).and_then(|mut h| h.hash(&elements)) {
        Ok(hash) => hash,
        Err(err) => {
            eprintln!("poseidon: {err}");
            return ExitCode::FAILURE;
        }
    };

    let bytes = commitment.into_bigint().to_bytes_be();
    println!();
    println!("commitment (decimal) = {}", commitment.into_bigint());
    print!("commitment (bytes32) = 0x");
    for b in &bytes {
        print!("{:02x}", b);
    }
    println!();
    ExitCode::SUCCESS
}
