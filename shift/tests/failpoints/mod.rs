mod cursor_advance_test;
