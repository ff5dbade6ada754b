pub mod shared {
    pub mod core {
        pub mod primitives;
    }
    pub mod infrastructure {
        pub mod postgres;
        pub mod retry_policy;
    }
}

pub mod modules {
    pub mod catalog {
        pub mod core {
            pub mod cursor;
            pub mod entity;
            pub mod mapper;
            pub mod rows;
            pub mod sku;
            pub mod summary;
        }
        pub mod use_cases {
            pub mod run_catalog_sync {
                pub mod command;
                pub mod errors;
                pub mod fetcher;
                pub mod handler;
                pub mod inbound {
                    pub mod graphql;
                    pub mod http;
                }
            }
            pub mod get_sync_status {
                pub mod inbound {
                    pub mod graphql;
                    pub mod http;
                }
                pub mod projection;
            }
            pub mod find_catalog_item {
                pub mod inbound {
                    pub mod graphql;
                    pub mod http;
                }
                pub mod projection;
                pub mod queries_port;
            }
        }
        pub mod adapters {
            pub mod outbound {
                pub mod catalog_source;
                pub mod catalog_source_http;
                pub mod catalog_source_in_memory;
                pub mod catalog_store;
                pub mod catalog_store_in_memory;
                pub mod catalog_store_postgres;
                pub mod sync_state;
                pub mod sync_state_in_memory;
                pub mod sync_state_postgres;
            }
        }
    }
}

pub mod shell;
