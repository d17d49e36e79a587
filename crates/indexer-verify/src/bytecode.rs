//! Bytecode comparison (spec.md §4.F).

/// The CBOR-encoded metadata hash solc appends to deployed bytecode is a
/// fixed 43-byte (86 hex char) trailer across the compiler versions this
/// engine targets.
const METADATA_TRAILER_BYTES: usize = 43;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BytecodeComparison {
    Verified,
    MetadataOnlyMatch,
    BytecodeMismatch,
}

fn strip_metadata(bytecode: &[u8]) -> &[u8] {
    if bytecode.len() > METADATA_TRAILER_BYTES {
        &bytecode[..bytecode.len() - METADATA_TRAILER_BYTES]
    } else {
        bytecode
    }
}

/// Compares on-chain deployed code against a fresh compile's deployed
/// bytecode, accounting for appended constructor arguments.
pub fn compare(onchain: &[u8], compiled: &[u8], constructor_args: Option<&[u8]>) -> BytecodeComparison {
    let onchain_body = strip_metadata(onchain);
    let compiled_body = strip_metadata(compiled);

    if onchain_body == compiled_body {
        return BytecodeComparison::Verified;
    }

    if let Some(args) = constructor_args {
        if onchain_body.len() == compiled_body.len() + args.len()
            && onchain_body.starts_with(compiled_body)
            && &onchain_body[compiled_body.len()..] == args
        {
            return BytecodeComparison::Verified;
        }
    }

    let onchain_metadata = metadata_trailer(onchain);
    let compiled_metadata = metadata_trailer(compiled);
    if onchain_metadata.is_some() && onchain_metadata == compiled_metadata {
        return BytecodeComparison::MetadataOnlyMatch;
    }

    BytecodeComparison::BytecodeMismatch
}

fn metadata_trailer(bytecode: &[u8]) -> Option<&[u8]> {
    if bytecode.len() > METADATA_TRAILER_BYTES {
        Some(&bytecode[bytecode.len() - METADATA_TRAILER_BYTES..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_metadata(body: &[u8], metadata: u8) -> Vec<u8> {
        let mut out = body.to_vec();
        out.extend(std::iter::repeat(metadata).take(METADATA_TRAILER_BYTES));
        out
    }

    #[test]
    fn identical_bodies_verify_regardless_of_metadata_hash() {
        let a = with_metadata(&[1, 2, 3], 0xaa);
        let b = with_metadata(&[1, 2, 3], 0xbb);
        assert_eq!(compare(&a, &b, None), BytecodeComparison::Verified);
    }

    #[test]
    fn onchain_suffix_matching_constructor_args_verifies() {
        let body = [1u8, 2, 3];
        let args = [9u8, 9, 9];
        let compiled = with_metadata(&body, 0xaa);
        let mut onchain = with_metadata(&body, 0xaa);
        onchain.splice(body.len()..body.len(), args.iter().copied());
        assert_eq!(
            compare(&onchain, &compiled, Some(&args)),
            BytecodeComparison::Verified
        );
    }

    #[test]
    fn matching_metadata_but_different_code_is_metadata_only_match() {
        let a = with_metadata(&[1, 2, 3], 0xaa);
        let b = with_metadata(&[9, 9, 9], 0xaa);
        assert_eq!(compare(&a, &b, None), BytecodeComparison::MetadataOnlyMatch);
    }

    #[test]
    fn unrelated_bytecode_is_a_mismatch() {
        let a = with_metadata(&[1, 2, 3], 0xaa);
        let b = with_metadata(&[9, 9, 9], 0xbb);
        assert_eq!(compare(&a, &b, None), BytecodeComparison::BytecodeMismatch);
    }
}
