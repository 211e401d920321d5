pub mod import_dispatcher;
