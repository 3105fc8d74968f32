pub mod word_filter;
