mod session_logs;
