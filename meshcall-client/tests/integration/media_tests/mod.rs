mod test_screen_share_fallback;
