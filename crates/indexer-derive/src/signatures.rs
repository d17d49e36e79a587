//! ABI signatures used to recognize and decode transfer events
//! (spec.md §4.D), declared with `alloy_sol_types::sol!` the same way the
//! teacher declares `Sig6492`/`TransferWithAuthorization`.

use alloy_sol_types::sol;

sol! {
    /// ERC-20's shape of `Transfer`: `value` is data, not a topic. Hashes to
    /// the same topic0 as [`TransferErc721`] below (the event signature hash
    /// only depends on name + types, not `indexed`-ness) — the two are told
    /// apart by topic count (see `decode::decode_transfer_logs`).
    #[derive(Debug)]
    event TransferErc20(address indexed from, address indexed to, uint256 value);

    /// ERC-721's shape: `tokenId` is indexed, giving 4 topics instead of 3.
    #[derive(Debug)]
    event TransferErc721(address indexed from, address indexed to, uint256 indexed tokenId);

    #[derive(Debug)]
    event TransferSingle(address indexed operator, address indexed from, address indexed to, uint256 id, uint256 value);

    #[derive(Debug)]
    event TransferBatch(address indexed operator, address indexed from, address indexed to, uint256[] ids, uint256[] values);

    interface IERC165 {
        function supportsInterface(bytes4 interfaceId) external view returns (bool);
    }

    interface IERC20Metadata {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
    }

    interface IERC721Metadata {
        function tokenURI(uint256 tokenId) external view returns (string);
    }

    interface IERC1155Metadata {
        function uri(uint256 tokenId) external view returns (string);
    }
}

/// `bytes4(keccak256("supportsInterface(bytes4)"))` selectors for the two
/// standards spec.md §4.E names explicitly.
pub const INTERFACE_ID_ERC721: [u8; 4] = [0x80, 0xac, 0x58, 0xcd];
pub const INTERFACE_ID_ERC1155: [u8; 4] = [0xd9, 0xb6, 0x7a, 0x26];
