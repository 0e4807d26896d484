diesel::table! {
    blocks (id) {
        id -> Text,
        height -> BigInt,
        previous_block -> Nullable<Text>,
        nonce -> Text,
        tx_ids -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    transactions (id) {
        id -> Text,
        owner -> Text,
        target -> Text,
        quantity -> Text,
        reward -> Text,
        tags -> Text,
        data_size -> BigInt,
        data_root -> Text,
        signature -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    missing_txs (tx_id) {
        tx_id -> Text,
        first_seen_height -> BigInt,
        attempts -> Integer,
        last_attempt_at -> Timestamp,
    }
}

diesel::allow_tables_to_appear_in_same_query!(blocks, transactions, missing_txs,);
