//! SQL schema for the bazaar SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision for future migrations.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Money columns hold decimal strings at two fractional digits.
-- Timestamps are fixed-width RFC 3339 UTC with microseconds, so they sort.

CREATE TABLE IF NOT EXISTS products (
    product_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    price       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS addresses (
    address_id      TEXT PRIMARY KEY,
    owner_id        TEXT NOT NULL,
    address_type    TEXT NOT NULL,   -- 'billing' | 'shipping' | 'work' | 'home' | 'other'
    recipient_name  TEXT NOT NULL,
    street          TEXT NOT NULL,
    city            TEXT NOT NULL,
    postal_code     TEXT NOT NULL,
    country         TEXT NOT NULL,
    is_default      INTEGER NOT NULL DEFAULT 0 CHECK (is_default IN (0, 1)),
    created_at      TEXT NOT NULL,
    UNIQUE (owner_id, address_type, street, city, postal_code, country)
);

-- At most one default address per owner.
CREATE UNIQUE INDEX IF NOT EXISTS addresses_one_default_idx
    ON addresses(owner_id) WHERE is_default = 1;
CREATE INDEX IF NOT EXISTS addresses_owner_idx ON addresses(owner_id, created_at);

CREATE TABLE IF NOT EXISTS carts (
    cart_id     TEXT PRIMARY KEY,
    owner_id    TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL
);

-- No foreign key to products: a retired product leaves its cart lines
-- behind, and placing that cart fails.
CREATE TABLE IF NOT EXISTS cart_items (
    cart_id     TEXT NOT NULL REFERENCES carts(cart_id) ON DELETE CASCADE,
    product_id  TEXT NOT NULL,
    quantity    INTEGER NOT NULL CHECK (quantity >= 1),
    added_at    TEXT NOT NULL,
    PRIMARY KEY (cart_id, product_id)
);

CREATE TABLE IF NOT EXISTS orders (
    order_id     TEXT PRIMARY KEY,
    owner_id     TEXT NOT NULL,
    status       TEXT NOT NULL,
    total_price  TEXT NOT NULL,
    created_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS orders_owner_idx ON orders(owner_id, created_at);

-- Snapshots taken at placement; never updated.
CREATE TABLE IF NOT EXISTS order_items (
    order_id      TEXT NOT NULL REFERENCES orders(order_id),
    line_no       INTEGER NOT NULL,
    product_id    TEXT NOT NULL,
    product_name  TEXT NOT NULL,
    quantity      INTEGER NOT NULL CHECK (quantity >= 1),
    unit_price    TEXT NOT NULL,
    PRIMARY KEY (order_id, line_no)
);

CREATE TABLE IF NOT EXISTS payments (
    payment_id   TEXT PRIMARY KEY,
    order_id     TEXT NOT NULL REFERENCES orders(order_id),
    amount       TEXT NOT NULL,
    gateway      TEXT NOT NULL,
    gateway_ref  TEXT,
    status       TEXT NOT NULL,
    refund_of    TEXT REFERENCES payments(payment_id),
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS payments_order_idx ON payments(order_id, created_at);
-- A charge is reversed at most once.
CREATE UNIQUE INDEX IF NOT EXISTS payments_one_reversal_idx
    ON payments(refund_of) WHERE refund_of IS NOT NULL;

CREATE TABLE IF NOT EXISTS discounts (
    discount_id      TEXT PRIMARY KEY,
    code             TEXT NOT NULL COLLATE NOCASE UNIQUE,
    description      TEXT NOT NULL DEFAULT '',
    discount_type    TEXT NOT NULL,   -- 'percentage' | 'fixed'
    amount           TEXT NOT NULL,
    min_order_value  TEXT,
    usage_limit      INTEGER CHECK (usage_limit IS NULL OR usage_limit >= 1),
    used_count       INTEGER NOT NULL DEFAULT 0
                     CHECK (used_count >= 0 AND (usage_limit IS NULL OR used_count <= usage_limit)),
    per_user_limit   INTEGER CHECK (per_user_limit IS NULL OR per_user_limit >= 1),
    is_active        INTEGER NOT NULL DEFAULT 1 CHECK (is_active IN (0, 1)),
    valid_from       TEXT NOT NULL,
    valid_until      TEXT,
    created_at       TEXT NOT NULL
);

-- NULL order ids are distinct under UNIQUE, so only order-bound
-- redemptions are deduplicated.
CREATE TABLE IF NOT EXISTS discount_redemptions (
    redemption_id   TEXT PRIMARY KEY,
    discount_id     TEXT NOT NULL REFERENCES discounts(discount_id),
    owner_id        TEXT NOT NULL,
    order_id        TEXT REFERENCES orders(order_id),
    amount_applied  TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    UNIQUE (discount_id, owner_id, order_id)
);
CREATE INDEX IF NOT EXISTS redemptions_owner_idx ON discount_redemptions(discount_id, owner_id);

PRAGMA user_version = 1;
";
